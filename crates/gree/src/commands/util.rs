//! Shared helpers for command handlers.

use std::collections::BTreeMap;
use std::time::Duration;

use gree_core::{Device, DeviceConfig, StatusCode, StatusSnapshot, StatusValue};

use crate::error::CliError;

/// Start a session and wait until the appliance has accepted the bind.
pub async fn connect(config: DeviceConfig, timeout: Duration) -> Result<Device, CliError> {
    let remote = config.remote();
    let device = Device::new(config);
    device
        .connect()
        .map_err(|e| CliError::from_core(e, remote))?;

    if let Err(e) = device.wait_bound(timeout).await {
        device.close().await;
        return Err(CliError::from_core(e, remote));
    }
    tracing::debug!(
        remote = %remote,
        mac = device.identifier().as_deref().unwrap_or("?"),
        "session ready"
    );
    Ok(device)
}

/// The status table once it holds data, waiting for the first poll if needed.
pub async fn first_status(device: &Device, timeout: Duration) -> Result<StatusSnapshot, CliError> {
    let mut stream = device.subscribe_status();
    if !stream.current().is_empty() {
        return Ok(stream.current().clone());
    }
    match tokio::time::timeout(timeout, stream.changed()).await {
        Ok(Some(snapshot)) => Ok(snapshot),
        Ok(None) => Err(CliError::NotConnected),
        Err(_) => Err(CliError::Timeout {
            address: device.config().remote().to_string(),
            seconds: timeout.as_secs(),
            waiting_for: "status",
        }),
    }
}

/// Resolve a user-supplied code (`power`, `Pow`, `pow`) to its wire code.
/// Anything the registry does not know passes through untouched.
pub fn resolve_code(input: &str) -> String {
    let input = input.trim();
    input
        .parse::<StatusCode>()
        .map_or_else(|_| input.to_owned(), |code| code.code().to_owned())
}

/// Parse `CODE=VALUE`. Values of known codes accept their named forms.
pub fn parse_assignment(raw: &str) -> Result<(String, StatusValue), CliError> {
    let Some((code, value)) = raw.split_once('=') else {
        return Err(CliError::Validation {
            field: "assignment".into(),
            reason: format!("expected CODE=VALUE, got '{raw}'"),
        });
    };
    let code = code.trim();
    let value = value.trim();
    if code.is_empty() || value.is_empty() {
        return Err(CliError::Validation {
            field: "assignment".into(),
            reason: format!("empty code or value in '{raw}'"),
        });
    }

    let parsed = match code.parse::<StatusCode>() {
        Ok(known) => {
            let named = known.values();
            if !named.is_empty() && known.value_of(value).is_none() && value.parse::<i64>().is_err()
            {
                let names: Vec<_> = named.iter().map(|(n, _)| *n).collect();
                return Err(CliError::Validation {
                    field: known.name().into(),
                    reason: format!("'{value}' is not one of {}", names.join(", ")),
                });
            }
            (known.code().to_owned(), known.parse_value(value))
        }
        Err(_) => {
            let value = value
                .parse::<i64>()
                .map_or_else(|_| StatusValue::from(value), StatusValue::Int);
            (code.to_owned(), value)
        }
    };
    Ok(parsed)
}

/// Restrict a snapshot to `codes` (already resolved). An empty filter keeps
/// everything. Unknown codes that the table lacks are reported.
pub fn select(
    snapshot: &StatusSnapshot,
    codes: &[String],
) -> Result<BTreeMap<String, StatusValue>, CliError> {
    if codes.is_empty() {
        return Ok(snapshot.as_ref().clone());
    }
    let mut out = BTreeMap::new();
    for code in codes {
        match snapshot.get(code) {
            Some(value) => {
                out.insert(code.clone(), value.clone());
            }
            None if StatusCode::from_code(code).is_none() => {
                return Err(CliError::UnknownCode { code: code.clone() });
            }
            None => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn codes_resolve_by_name_or_wire_code() {
        assert_eq!(resolve_code("power"), "Pow");
        assert_eq!(resolve_code("Pow"), "Pow");
        assert_eq!(resolve_code("targetTemperature"), "SetTem");
        assert_eq!(resolve_code("Quiet"), "Quiet");
    }

    #[test]
    fn assignments_accept_named_values() {
        assert_eq!(
            parse_assignment("power=on").unwrap(),
            ("Pow".to_owned(), StatusValue::Int(1))
        );
        assert_eq!(
            parse_assignment("mode = cool").unwrap(),
            ("Mod".to_owned(), StatusValue::Int(1))
        );
        assert_eq!(
            parse_assignment("SetTem=24").unwrap(),
            ("SetTem".to_owned(), StatusValue::Int(24))
        );
    }

    #[test]
    fn raw_codes_pass_through() {
        assert_eq!(
            parse_assignment("Quiet=1").unwrap(),
            ("Quiet".to_owned(), StatusValue::Int(1))
        );
        assert_eq!(
            parse_assignment("host=abc").unwrap(),
            ("host".to_owned(), StatusValue::from("abc"))
        );
    }

    #[test]
    fn malformed_assignments_are_usage_errors() {
        for raw in ["power", "=1", "power=", "mode=sideways"] {
            let err = parse_assignment(raw).unwrap_err();
            assert!(matches!(err, CliError::Validation { .. }), "{raw}");
        }
    }

    #[test]
    fn select_filters_and_reports_unknown_codes() {
        let snapshot: StatusSnapshot = Arc::new(BTreeMap::from([
            ("Pow".to_owned(), StatusValue::Int(1)),
            ("Mod".to_owned(), StatusValue::Int(4)),
        ]));

        let picked = select(&snapshot, &["Pow".to_owned(), "Lig".to_owned()]).unwrap();
        assert_eq!(picked.len(), 1);

        let err = select(&snapshot, &["Bogus".to_owned()]).unwrap_err();
        assert!(matches!(err, CliError::UnknownCode { .. }));

        assert_eq!(select(&snapshot, &[]).unwrap().len(), 2);
    }
}
