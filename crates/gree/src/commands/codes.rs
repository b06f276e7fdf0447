//! `gree codes`: list the status-code registry. Needs no appliance.

use gree_core::StatusCode;

use crate::config::OutputSettings;
use crate::error::CliError;
use crate::output::{self, CodeRow};

pub fn handle(settings: &OutputSettings) -> Result<(), CliError> {
    let rows: Vec<CodeRow> = StatusCode::all().map(CodeRow::from).collect();
    let out = output::render_list(settings.format, &rows, |row| row.code.to_owned())?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
