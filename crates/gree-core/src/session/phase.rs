use serde::Serialize;

/// Where a session stands in the discover → bind → poll lifecycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionPhase {
    /// No socket. Initial state, and the state after `close()`.
    #[default]
    Disconnected,
    /// Scanning for the appliance.
    Discovering,
    /// Appliance identifier known, waiting for a session key.
    Binding,
    /// Session key held; polling.
    Bound,
}

impl SessionPhase {
    pub fn is_bound(self) -> bool {
        self == Self::Bound
    }
}
