//! `gree watch`: reprint the status table on every change until Ctrl-C.

use gree_core::{Device, StatusSnapshot};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::OutputSettings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(device: &Device, args: WatchArgs, settings: &OutputSettings) -> Result<(), CliError> {
    let codes: Vec<String> = args.codes.iter().map(|c| util::resolve_code(c)).collect();
    let mut stream = device.subscribe_status();
    let mut printed = 0usize;

    if !stream.current().is_empty() {
        print_frame(stream.current(), &codes, settings)?;
        printed += 1;
    }

    while args.count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
            snapshot = stream.changed() => {
                let Some(snapshot) = snapshot else {
                    return Err(CliError::NotConnected);
                };
                print_frame(&snapshot, &codes, settings)?;
                printed += 1;
            }
        }
    }
    Ok(())
}

fn print_frame(
    snapshot: &StatusSnapshot,
    codes: &[String],
    settings: &OutputSettings,
) -> Result<(), CliError> {
    let selected = util::select(snapshot, codes)?;
    let body = output::render_status(settings.format, &selected)?;

    // Structured formats stay one document per update.
    let out = if settings.format == OutputFormat::Table {
        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
        format!("{}\n{body}", output::header(&format!("── {stamp} ──"), settings.color))
    } else {
        body
    };
    output::print_output(&out, settings.quiet);
    Ok(())
}
