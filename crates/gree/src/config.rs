//! Flag-aware configuration: combines the TOML profile file with global
//! CLI flags and produces the `DeviceConfig` plus output settings.
//!
//! Precedence: flag > env > profile > `[defaults]`.

use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;

use gree_config::{Config, Profile};
use gree_core::DeviceConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use gree_config::{config_path, load_config_or_default, save_config};

// ── Output settings ─────────────────────────────────────────────────

/// Output settings resolved once per invocation.
#[derive(Debug, Clone, Copy)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub timeout: Duration,
}

impl OutputSettings {
    pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Self {
        let format = global
            .output
            .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
            .unwrap_or(OutputFormat::Table);
        let color_mode = global
            .color
            .or_else(|| ColorMode::from_str(&cfg.defaults.color, true).ok())
            .unwrap_or(ColorMode::Auto);
        let timeout = global.timeout.unwrap_or(cfg.defaults.timeout);

        Self {
            format,
            color: should_color(color_mode),
            quiet: global.quiet,
            timeout: Duration::from_secs(timeout.max(1)),
        }
    }
}

/// Determine whether color output should be enabled.
fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

// ── Profile resolution ──────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build the `DeviceConfig` for this invocation.
///
/// A profile (named or default) supplies the base; `--address`, `--port` and
/// `--mac` override it. With no profile at all, `--address` alone suffices.
pub fn resolve_device_config(global: &GlobalOpts, cfg: &Config) -> Result<DeviceConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.address.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(address) = &global.address {
        profile.address.clone_from(address);
    }
    if let Some(port) = global.port {
        profile.port = Some(port);
    }
    if let Some(mac) = &global.mac {
        profile.mac = Some(mac.clone());
    }

    tracing::debug!(profile = %profile_name, address = %profile.address, "resolved appliance profile");
    Ok(gree_config::profile_to_device_config(&profile, &cfg.defaults)?)
}
