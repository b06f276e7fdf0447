//! Config subcommand handlers.

use dialoguer::{Confirm, Input};
use serde::Serialize;
use tabled::Tabled;

use gree_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, OutputSettings};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.trim().parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

#[derive(Debug, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Port", display_with = "display_opt")]
    port: Option<u16>,
    #[tabled(rename = "MAC", display_with = "display_opt")]
    mac: Option<String>,
    #[tabled(rename = "Default", display_with = "display_marker")]
    default: bool,
}

#[allow(clippy::ref_option)]
fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| "-".into(), ToString::to_string)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn display_marker(default: &bool) -> String {
    if *default { "*".into() } else { String::new() }
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "address" => {
            gree_config::parse_address(&value)?;
            profile.address = value;
        }
        "port" => profile.port = Some(parse_field("port", &value, "a port number")?),
        "mac" => profile.mac = Some(value).filter(|m| !m.is_empty()),
        "retry_interval_ms" | "retry-interval-ms" => {
            profile.retry_interval_ms =
                Some(parse_field("retry_interval_ms", &value, "milliseconds")?);
        }
        "poll_interval_ms" | "poll-interval-ms" => {
            profile.poll_interval_ms =
                Some(parse_field("poll_interval_ms", &value, "milliseconds")?);
        }
        "extra_columns" | "extra-columns" => {
            profile.extra_columns = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect();
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: address, port, mac, \
                     retry_interval_ms, poll_interval_ms, extra_columns"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    settings: &OutputSettings,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), settings.quiet);
            Ok(())
        }

        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("gree configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = if config_path.exists() {
                gree_config::load_config()?
            } else {
                Config::default()
            };

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let address: String = Input::new()
                .with_prompt("Appliance IP (or broadcast address to discover)")
                .default("192.168.1.255".into())
                .validate_with(|input: &String| {
                    gree_config::parse_address(input)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let mac: String = Input::new()
                .with_prompt("Appliance MAC (leave empty to discover)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            if cfg.profiles.contains_key(&profile_name) {
                let overwrite = Confirm::new()
                    .with_prompt(format!("Profile '{profile_name}' exists. Overwrite?"))
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?;
                if !overwrite {
                    eprintln!("Aborted; nothing written.");
                    return Ok(());
                }
            }

            let profile = Profile {
                address,
                mac: Some(mac.trim().to_owned()).filter(|m| !m.is_empty()),
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;
            output::success(
                &format!("Configuration written to {}", path.display()),
                settings.color,
                settings.quiet,
            );
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: gree status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = gree_config::load_config()?;
            let out = output::render_single(
                settings.format,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, settings.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = gree_config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_profile_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            output::success(
                &format!("Set {key} on profile '{profile_name}'"),
                settings.color,
                settings.quiet,
            );
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: gree config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let rows: Vec<ProfileRow> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileRow {
                    name: name.clone(),
                    address: p.address.clone(),
                    port: p.port,
                    mac: p.mac.clone(),
                    default: name == default,
                })
                .collect();
            let out = output::render_list(settings.format, &rows, |r| r.name.clone())?;
            output::print_output(&out, settings.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = gree_config::load_config()?;

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::success(
                &format!("Default profile set to '{name}'"),
                settings.color,
                settings.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_profile_key_updates_fields() {
        let mut profile = Profile::default();
        set_profile_key(&mut profile, "address", "10.0.0.7".into()).unwrap();
        set_profile_key(&mut profile, "port", "7001".into()).unwrap();
        set_profile_key(&mut profile, "extra-columns", "Quiet, Tur".into()).unwrap();
        set_profile_key(&mut profile, "mac", String::new()).unwrap();

        assert_eq!(profile.address, "10.0.0.7");
        assert_eq!(profile.port, Some(7001));
        assert_eq!(profile.extra_columns, vec!["Quiet", "Tur"]);
        assert!(profile.mac.is_none());
    }

    #[test]
    fn set_profile_key_rejects_bad_input() {
        let mut profile = Profile::default();
        assert!(set_profile_key(&mut profile, "address", "not-an-ip".into()).is_err());
        assert!(set_profile_key(&mut profile, "port", "seventy".into()).is_err());
        assert!(matches!(
            set_profile_key(&mut profile, "colour", "red".into()),
            Err(CliError::Validation { .. })
        ));
    }
}
