//! Clap derive structures for the `gree` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gree -- control Gree-family air conditioners over the local network
#[derive(Debug, Parser)]
#[command(
    name = "gree",
    version,
    about = "Control Gree-family air conditioners over the local network",
    long_about = "Talks to Gree-protocol climate appliances over UDP (port 7000).\n\n\
        Discovers the appliance, performs the bind handshake, then polls its\n\
        status table. Profiles live in a TOML file managed by `gree config`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Appliance profile to use
    #[arg(long, short = 'p', env = "GREE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Appliance IP or broadcast address (overrides profile)
    #[arg(long, short = 'a', env = "GREE_ADDRESS", global = true)]
    pub address: Option<String>,

    /// UDP port (overrides profile)
    #[arg(long, env = "GREE_PORT", global = true)]
    pub port: Option<u16>,

    /// Appliance MAC; skips discovery (overrides profile)
    #[arg(long, env = "GREE_MAC", global = true)]
    pub mac: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "GREE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Seconds to wait for bind and replies [default: from config, else 10]
    #[arg(long, env = "GREE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain `CODE=VALUE` lines (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the appliance status table
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Send one batch of commands (CODE=VALUE ...)
    Set(SetArgs),

    /// Print the status table every time it changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List known status codes and their named values
    Codes,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show these codes (wire code `Pow` or name `power`)
    #[arg(value_name = "CODE")]
    pub codes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Assignments such as `power=on`, `SetTem=24`, `mode=cool`
    #[arg(value_name = "CODE=VALUE", required = true)]
    pub assignments: Vec<String>,

    /// Return once the batch is sent instead of waiting for the ack
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Only show these codes
    #[arg(value_name = "CODE")]
    pub codes: Vec<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration
    Show,

    /// Interactive setup wizard
    Init,

    /// Set a value on the active profile
    Set {
        /// Profile key (address, port, mac, retry_interval_ms, poll_interval_ms, extra_columns)
        key: String,
        /// New value
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
