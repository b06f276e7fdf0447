// ── Core error types ──
//
// User-facing errors from gree-core. The session itself never fails
// (everything inside it is retried or dropped); these surface at the
// consumer-facing edges: waiting for a bind, sending on a closed device,
// misconfiguration. The `From<gree_api::Error>` impl translates wire-layer
// errors into these variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot open UDP socket: {reason}")]
    SocketUnavailable { reason: String },

    #[error("Device session is not running")]
    NotConnected,

    #[error("Timed out after {timeout_ms}ms waiting for {waiting_for}")]
    Timeout {
        timeout_ms: u64,
        waiting_for: &'static str,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn timeout(timeout: std::time::Duration, waiting_for: &'static str) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waiting_for,
        }
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<gree_api::Error> for CoreError {
    fn from(err: gree_api::Error) -> Self {
        match err {
            gree_api::Error::Io(e) => CoreError::SocketUnavailable {
                reason: e.to_string(),
            },
            gree_api::Error::InvalidKeyLength { len } => CoreError::Protocol {
                message: format!("session key has invalid length {len}"),
            },
            e @ (gree_api::Error::Json(_)
            | gree_api::Error::Base64(_)
            | gree_api::Error::Padding(_)) => CoreError::Protocol {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn io_maps_to_socket_unavailable() {
        let err: CoreError = gree_api::Error::from(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no route",
        ))
        .into();
        assert!(matches!(err, CoreError::SocketUnavailable { .. }));
    }

    #[test]
    fn timeout_message_names_the_wait() {
        let err = CoreError::timeout(Duration::from_millis(1500), "bind");
        assert_eq!(err.to_string(), "Timed out after 1500ms waiting for bind");
    }
}
