use thiserror::Error;

/// Top-level error type for the `gree-api` crate.
///
/// Covers every failure mode of the wire layer: socket I/O, frame and
/// message (de)serialization, and the pack cipher. `gree-core` maps these
/// into session-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Socket bind/send/receive failure.
    #[error("UDP transport error: {0}")]
    Io(#[from] std::io::Error),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON (de)serialization failed for a frame or an inner message.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `pack` field was not valid base64.
    #[error("Invalid base64 in pack: {0}")]
    Base64(#[from] base64::DecodeError),

    // ── Cipher ──────────────────────────────────────────────────────
    /// Pack cipher keys must be exactly 16 bytes.
    #[error("Invalid cipher key length: expected 16 bytes, got {len}")]
    InvalidKeyLength { len: usize },

    /// Ciphertext length or PKCS#7 padding was malformed (usually a wrong key).
    #[error("Malformed ciphertext: {0}")]
    Padding(&'static str),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` if the error came from decoding an inbound datagram,
    /// i.e. the message should be dropped and the session continued.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::Json(_) | Self::Base64(_) | Self::Padding(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_transient() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "address in use",
        ));
        assert!(err.is_transient());
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn decode_errors_are_malformed_input() {
        assert!(Error::Padding("bad padding").is_malformed_input());
        assert!(!Error::InvalidKeyLength { len: 3 }.is_transient());
    }
}
