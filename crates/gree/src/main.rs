mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::OutputSettings;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Completions(args) = &cli.command {
        use clap::CommandFactory;
        use clap_complete::generate;

        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "gree", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = gree_config::load_config()?;
    let settings = OutputSettings::resolve(&cli.global, &cfg);

    match cli.command {
        // Neither of these needs an appliance
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, &settings),
        Command::Codes => commands::codes::handle(&settings),

        cmd => {
            // Reject malformed assignments before binding.
            if let Command::Set(args) = &cmd {
                for raw in &args.assignments {
                    commands::util::parse_assignment(raw)?;
                }
            }

            let device_config = config::resolve_device_config(&cli.global, &cfg)?;
            let device = commands::util::connect(device_config, settings.timeout).await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &device, &settings).await;
            device.close().await;
            result
        }
    }
}
