//! `gree set`: send one batch of commands and report the acknowledged values.

use std::collections::BTreeMap;

use gree_core::{CommandBatch, Device, StatusValue};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::SetArgs;
use crate::config::OutputSettings;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(device: &Device, args: SetArgs, settings: &OutputSettings) -> Result<(), CliError> {
    let mut batch = CommandBatch::new();
    for raw in &args.assignments {
        let (code, value) = util::parse_assignment(raw)?;
        batch.insert(code, value);
    }
    let requested: BTreeMap<String, StatusValue> = batch
        .iter()
        .map(|(code, value)| (code.to_owned(), value.clone()))
        .collect();

    // Subscribe before sending so the ack cannot slip past.
    let mut acks = device.subscribe_acks();
    device.send_commands(batch)?;
    tracing::debug!(count = requested.len(), "command batch queued");

    if args.no_wait {
        output::success(
            &format!("Sent {} command(s)", requested.len()),
            settings.color,
            settings.quiet,
        );
        return Ok(());
    }

    // The appliance may confirm a different value than the one sent
    // (a clamped set-point, say). Whatever `res` carries is the answer.
    let wait = async {
        let mut confirmed = BTreeMap::new();
        loop {
            match acks.recv().await {
                Ok(acked) => {
                    for (code, value) in acked.iter().filter(|(c, _)| requested.contains_key(*c)) {
                        confirmed.insert(code.clone(), value.clone());
                    }
                    if requested.keys().all(|c| confirmed.contains_key(c)) {
                        return Ok(confirmed);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "missed command acknowledgements");
                }
                Err(RecvError::Closed) => return Err(CliError::NotConnected),
            }
        }
    };

    let confirmed = tokio::time::timeout(settings.timeout, wait)
        .await
        .map_err(|_| CliError::Timeout {
            address: device.config().remote().to_string(),
            seconds: settings.timeout.as_secs(),
            waiting_for: "command ack",
        })??;

    for (code, value) in &confirmed {
        if let Some(sent) = requested.get(code).filter(|sent| *sent != value) {
            tracing::info!(code = %code, %sent, confirmed = %value, "appliance adjusted value");
        }
    }

    let out = output::render_status(settings.format, &confirmed)?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
