//! Shared configuration for gree tools.
//!
//! TOML profiles (one per appliance) with global defaults, environment
//! overrides, and translation to `gree_core::DeviceConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gree_core::{DEFAULT_POLL_INTERVAL, DEFAULT_PORT, DEFAULT_RETRY_INTERVAL, DeviceConfig};

/// Prefix for environment overrides. Nested keys use a double underscore:
/// `GREE_DEFAULTS__POLL_INTERVAL_MS=2000`.
pub const ENV_PREFIX: &str = "GREE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolve a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Seconds the CLI waits for bind / replies.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            port: default_port(),
            retry_interval_ms: default_retry_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_retry_interval_ms() -> u64 {
    duration_ms(DEFAULT_RETRY_INTERVAL)
}
fn default_poll_interval_ms() -> u64 {
    duration_ms(DEFAULT_POLL_INTERVAL)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A named appliance profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Appliance IP address, or a broadcast address for discovery.
    pub address: String,

    /// Override the UDP port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Known appliance MAC; skips discovery when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Extra status columns to poll beyond the built-in registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_columns: Vec<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "gree", "gree").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gree");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse an appliance address.
pub fn parse_address(raw: &str) -> Result<IpAddr, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Validation {
        field: "address".into(),
        reason: format!("'{raw}' is not an IP address"),
    })
}

/// Build a `DeviceConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_device_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let address = parse_address(&profile.address)?;
    let retry_ms = profile.retry_interval_ms.unwrap_or(defaults.retry_interval_ms);
    let poll_ms = profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms);

    if retry_ms == 0 {
        return Err(ConfigError::Validation {
            field: "retry_interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if poll_ms == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let mut config = DeviceConfig::new(address)
        .with_port(profile.port.unwrap_or(defaults.port))
        .with_retry_interval(Duration::from_millis(retry_ms))
        .with_poll_interval(Duration::from_millis(poll_ms));
    if let Some(mac) = &profile.mac {
        config = config.with_mac(mac.trim());
    }
    config.extra_columns.clone_from(&profile.extra_columns);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "living-room"

[defaults]
timeout = 5
poll_interval_ms = 2000

[profiles.living-room]
address = "192.168.1.50"
mac = "f4911e7af2f2"

[profiles.bedroom]
address = "192.168.1.255"
port = 7001
retry_interval_ms = 1000
"#;

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("living-room"));
        assert_eq!(config.defaults.timeout, 5);
        assert_eq!(config.defaults.poll_interval_ms, 2000);
        assert_eq!(config.defaults.retry_interval_ms, 5000);
        assert_eq!(config.defaults.output, "table");
        assert_eq!(config.profiles.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn profile_lookup_falls_back_to_default_profile() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "living-room");
        assert_eq!(profile.mac.as_deref(), Some("f4911e7af2f2"));

        let (name, _) = config.profile(Some("bedroom")).unwrap();
        assert_eq!(name, "bedroom");

        assert!(matches!(
            config.profile(Some("garage")),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn profile_overrides_defaults() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();

        let (_, bedroom) = config.profile(Some("bedroom")).unwrap();
        let device = profile_to_device_config(bedroom, &config.defaults).unwrap();
        assert_eq!(device.port, 7001);
        assert_eq!(device.retry_interval, Duration::from_millis(1000));
        assert_eq!(device.poll_interval, Duration::from_millis(2000));
        assert!(device.mac.is_none());

        let (_, living) = config.profile(None).unwrap();
        let device = profile_to_device_config(living, &config.defaults).unwrap();
        assert_eq!(device.port, 7000);
        assert_eq!(device.mac.as_deref(), Some("f4911e7af2f2"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let defaults = Defaults::default();
        let bad_address = Profile {
            address: "aircon.local".into(),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_device_config(&bad_address, &defaults),
            Err(ConfigError::Validation { field, .. }) if field == "address"
        ));

        let zero_poll = Profile {
            address: "10.0.0.2".into(),
            poll_interval_ms: Some(0),
            ..Profile::default()
        };
        assert!(profile_to_device_config(&zero_poll, &defaults).is_err());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                address: "10.0.0.9".into(),
                mac: Some("c8f742000000".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let (_, profile_section) = written.split_once("[profiles.default]").unwrap();
        assert!(
            !profile_section.contains("retry_interval_ms"),
            "unset overrides are omitted:\n{written}"
        );
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
