//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use gree_config::ConfigError;
use gree_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not open a UDP socket towards {address}")]
    #[diagnostic(
        code(gree::socket_unavailable),
        help("Check the address and that this host has a route to it.\nReason: {reason}")
    )]
    SocketUnavailable { address: String, reason: String },

    #[error("Device session is not running")]
    #[diagnostic(code(gree::not_connected))]
    NotConnected,

    #[error("No answer from {address} after {seconds}s waiting for {waiting_for}")]
    #[diagnostic(
        code(gree::timeout),
        help(
            "Check that the appliance is powered and on the same network.\n\
             For a broadcast address, try the appliance's own IP with --address.\n\
             Increase the wait with --timeout."
        )
    )]
    Timeout {
        address: String,
        seconds: u64,
        waiting_for: &'static str,
    },

    #[error("Protocol error: {message}")]
    #[diagnostic(code(gree::protocol))]
    Protocol { message: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("Unknown status code '{code}'")]
    #[diagnostic(
        code(gree::unknown_code),
        help("Run: gree codes to see known codes, or use the raw wire code")
    )]
    UnknownCode { code: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gree::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(gree::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: gree config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No appliance configured")]
    #[diagnostic(
        code(gree::no_config),
        help(
            "Pass --address <IP>, or create a profile with: gree config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(gree::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(gree::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(gree::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(gree::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SocketUnavailable { .. } | Self::NotConnected => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::UnknownCode { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the appliance address to errors that only the caller knows it for.
    pub fn from_core(err: CoreError, address: impl std::fmt::Display) -> Self {
        match err {
            CoreError::SocketUnavailable { reason } => Self::SocketUnavailable {
                address: address.to_string(),
                reason,
            },
            CoreError::Timeout {
                timeout_ms,
                waiting_for,
            } => Self::Timeout {
                address: address.to_string(),
                seconds: timeout_ms.div_ceil(1000),
                waiting_for,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SocketUnavailable { reason } => CliError::SocketUnavailable {
                address: "(unknown)".into(),
                reason,
            },
            CoreError::NotConnected => CliError::NotConnected,
            CoreError::Timeout {
                timeout_ms,
                waiting_for,
            } => CliError::Timeout {
                address: "(unknown)".into(),
                seconds: timeout_ms.div_ceil(1000),
                waiting_for,
            },
            CoreError::Protocol { message } => CliError::Protocol { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(unknown)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
