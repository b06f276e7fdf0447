//! Command dispatch: bridges CLI args -> device session -> output formatting.

pub mod codes;
pub mod config_cmd;
pub mod set;
pub mod status;
pub mod util;
pub mod watch;

use gree_core::Device;

use crate::cli::Command;
use crate::config::OutputSettings;
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    device: &Device,
    settings: &OutputSettings,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(device, args, settings).await,
        Command::Set(args) => set::handle(device, args, settings).await,
        Command::Watch(args) => watch::handle(device, args, settings).await,
        // Handled before a device is opened
        Command::Codes | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
