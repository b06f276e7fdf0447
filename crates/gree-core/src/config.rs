// ── Runtime session configuration ──
//
// Describes *which* appliance to talk to and how patiently. Never touches
// disk: the CLI (or any other consumer) builds a `DeviceConfig` and hands
// it to `Device`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use gree_api::DEFAULT_CLIENT_ID;

use crate::error::CoreError;
use crate::model::StatusCode;

/// UDP port appliances listen on.
pub const DEFAULT_PORT: u16 = 7000;

/// Delay before re-sending a scan/bind or re-opening the socket.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(5000);

/// Status poll period once bound.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for a session with a single appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Appliance IP, or a broadcast address when the MAC is unknown.
    pub address: IpAddr,
    pub port: u16,
    /// Pre-seeded appliance identifier. When set, discovery is skipped.
    pub mac: Option<String>,
    /// Value of `cid` on outbound frames.
    pub client_id: String,
    pub retry_interval: Duration,
    pub poll_interval: Duration,
    /// Columns polled in addition to the registry codes.
    pub extra_columns: Vec<String>,
}

impl DeviceConfig {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            port: DEFAULT_PORT,
            mac: None,
            client_id: DEFAULT_CLIENT_ID.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            extra_columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into()).filter(|m: &String| !m.is_empty());
        self
    }

    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn remote(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Reject settings the session task cannot run with. A zero poll
    /// period cannot drive a timer and a zero retry interval would resend
    /// scans back to back.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.retry_interval.is_zero() {
            return Err(CoreError::Config {
                message: "retry interval must be greater than zero".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Columns requested by every status poll: the registry, then extras.
    pub fn poll_columns(&self) -> Vec<String> {
        let mut cols = StatusCode::all_codes();
        for extra in &self.extra_columns {
            if !cols.contains(extra) {
                cols.push(extra.clone());
            }
        }
        cols
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_appliance_family() {
        let config = DeviceConfig::new("192.168.1.50".parse().unwrap());
        assert_eq!(config.port, 7000);
        assert_eq!(config.client_id, "app");
        assert_eq!(config.retry_interval, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.remote(), "192.168.1.50:7000".parse().unwrap());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let base = DeviceConfig::new("10.0.0.2".parse().unwrap());
        assert!(base.validate().is_ok());

        let no_poll = base.clone().with_poll_interval(Duration::ZERO);
        assert!(matches!(no_poll.validate(), Err(CoreError::Config { .. })));

        let no_retry = base.with_retry_interval(Duration::ZERO);
        assert!(matches!(no_retry.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn empty_mac_is_treated_as_unknown() {
        let config = DeviceConfig::new("10.0.0.2".parse().unwrap()).with_mac("");
        assert!(config.mac.is_none());
    }

    #[test]
    fn extra_columns_are_appended_once() {
        let mut config = DeviceConfig::new("10.0.0.2".parse().unwrap());
        config.extra_columns = vec!["Pow".into(), "Quiet".into()];
        let cols = config.poll_columns();
        assert_eq!(cols.iter().filter(|c| *c == "Pow").count(), 1);
        assert_eq!(cols.last().map(String::as_str), Some("Quiet"));
    }
}
