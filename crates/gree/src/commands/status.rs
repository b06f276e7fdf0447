//! `gree status`: print the appliance's status table.

use gree_core::Device;

use crate::cli::StatusArgs;
use crate::config::OutputSettings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    device: &Device,
    args: StatusArgs,
    settings: &OutputSettings,
) -> Result<(), CliError> {
    let codes: Vec<String> = args.codes.iter().map(|c| util::resolve_code(c)).collect();
    let snapshot = util::first_status(device, settings.timeout).await?;
    let selected = util::select(&snapshot, &codes)?;

    let out = output::render_status(settings.format, &selected)?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
