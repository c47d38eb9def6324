//! Config commands.

use std::path::Path;

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use dialoguer::Input;

use wc_core::config::SdkConfig;
use wc_core::error::{WcError, WcResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all settings.
    Show,
    /// Print the config file path.
    Path,
    /// Get a setting value by key path.
    Get {
        /// Setting key path (e.g., "backend.api_url", "realtime.max_reconnect_attempts").
        key: String,
    },
    /// Set a setting value by key path and save the file.
    Set {
        /// Setting key path.
        key: String,
        /// New value.
        value: String,
    },
    /// Create the config file, prompting for the backend URL.
    Init,
}

const KEYS: &[&str] = &[
    "backend.api_url",
    "backend.socket_url",
    "backend.api_timeout_ms",
    "backend.accept_invalid_certs",
    "realtime.reconnect_base_delay_ms",
    "realtime.reconnect_max_delay_ms",
    "realtime.max_reconnect_attempts",
    "realtime.jitter_factor",
    "realtime.connect_timeout_ms",
    "realtime.ping_interval_ms",
    "realtime.max_missed_pings",
    "realtime.event_capacity",
    "logging.level",
    "logging.directory",
    "logging.json_output",
];

/// Resolve a dot-separated key path to a value from the config.
fn get_setting_value(cfg: &SdkConfig, key: &str) -> Option<String> {
    match key {
        "backend.api_url" => Some(cfg.backend.api_url.clone()),
        "backend.socket_url" => Some(cfg.backend.effective_socket_url()),
        "backend.api_timeout_ms" => Some(cfg.backend.api_timeout_ms.to_string()),
        "backend.accept_invalid_certs" => Some(cfg.backend.accept_invalid_certs.to_string()),
        "realtime.reconnect_base_delay_ms" => Some(cfg.realtime.reconnect_base_delay_ms.to_string()),
        "realtime.reconnect_max_delay_ms" => Some(cfg.realtime.reconnect_max_delay_ms.to_string()),
        "realtime.max_reconnect_attempts" => Some(cfg.realtime.max_reconnect_attempts.to_string()),
        "realtime.jitter_factor" => Some(cfg.realtime.jitter_factor.to_string()),
        "realtime.connect_timeout_ms" => Some(cfg.realtime.connect_timeout_ms.to_string()),
        "realtime.ping_interval_ms" => Some(cfg.realtime.ping_interval_ms.to_string()),
        "realtime.max_missed_pings" => Some(cfg.realtime.max_missed_pings.to_string()),
        "realtime.event_capacity" => Some(cfg.realtime.event_capacity.to_string()),
        "logging.level" => Some(cfg.logging.level.clone()),
        "logging.directory" => Some(cfg.logging.directory.clone()),
        "logging.json_output" => Some(cfg.logging.json_output.to_string()),
        _ => None,
    }
}

fn parse<T: std::str::FromStr>(value: &str, expected: &str) -> Result<T, String> {
    value.trim().parse().map_err(|_| format!("expected {expected}"))
}

/// Apply a value to a dot-separated key path on the config.
fn set_setting_value(cfg: &mut SdkConfig, key: &str, value: &str) -> Result<(), String> {
    match key {
        "backend.api_url" => cfg.backend.api_url = SdkConfig::sanitize_url(value),
        "backend.socket_url" => cfg.backend.socket_url = SdkConfig::sanitize_url(value),
        "backend.api_timeout_ms" => cfg.backend.api_timeout_ms = parse(value, "an integer")?,
        "backend.accept_invalid_certs" => {
            cfg.backend.accept_invalid_certs = parse(value, "true/false")?
        }
        "realtime.reconnect_base_delay_ms" => {
            cfg.realtime.reconnect_base_delay_ms = parse(value, "an integer")?
        }
        "realtime.reconnect_max_delay_ms" => {
            cfg.realtime.reconnect_max_delay_ms = parse(value, "an integer")?
        }
        "realtime.max_reconnect_attempts" => {
            cfg.realtime.max_reconnect_attempts = parse(value, "an integer (0 = unlimited)")?
        }
        "realtime.jitter_factor" => {
            let factor: f64 = parse(value, "a number")?;
            if !(0.0..=1.0).contains(&factor) {
                return Err("expected a number between 0 and 1".to_string());
            }
            cfg.realtime.jitter_factor = factor;
        }
        "realtime.connect_timeout_ms" => {
            cfg.realtime.connect_timeout_ms = parse(value, "an integer")?
        }
        "realtime.ping_interval_ms" => cfg.realtime.ping_interval_ms = parse(value, "an integer")?,
        "realtime.max_missed_pings" => cfg.realtime.max_missed_pings = parse(value, "an integer")?,
        "realtime.event_capacity" => cfg.realtime.event_capacity = parse(value, "an integer")?,
        "logging.level" => {
            let v = value.to_lowercase();
            if !["trace", "debug", "info", "warn", "error"].contains(&v.as_str()) {
                return Err("expected one of: trace, debug, info, warn, error".to_string());
            }
            cfg.logging.level = v;
        }
        "logging.directory" => cfg.logging.directory = value.trim().to_string(),
        "logging.json_output" => cfg.logging.json_output = parse(value, "true/false")?,
        _ => return Err(format!("unknown setting: {key}")),
    }
    Ok(())
}

/// Run a config subcommand.
pub fn run(mut config: SdkConfig, path: &Path, action: ConfigAction, format: OutputFormat) -> WcResult<()> {
    match action {
        ConfigAction::Show => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config).unwrap_or_default());
                }
                OutputFormat::Text => {
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["Setting", "Value"]);
                    for key in KEYS {
                        let value = get_setting_value(&config, key).unwrap_or_default();
                        table.add_row(vec![key.to_string(), super::truncate(&value, 60)]);
                    }
                    println!("{table}");
                }
            }
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Get { key } => match get_setting_value(&config, &key) {
            Some(value) => {
                println!("{value}");
                Ok(())
            }
            None => Err(WcError::Config(format!("unknown setting: {key}"))),
        },
        ConfigAction::Set { key, value } => {
            set_setting_value(&mut config, &key, &value).map_err(WcError::Config)?;
            config.save_to_file(path)?;
            println!(
                "  {} {key} = {}",
                style("OK").green(),
                get_setting_value(&config, &key).unwrap_or_default()
            );
            Ok(())
        }
        ConfigAction::Init => {
            let api_url: String = Input::new()
                .with_prompt("Backend URL")
                .with_initial_text(config.backend.api_url.clone())
                .interact_text()
                .map_err(|e| WcError::Internal(e.to_string()))?;
            config.backend.api_url = SdkConfig::sanitize_url(&api_url);
            config.save_to_file(path)?;
            println!("  {} Config saved to {}", style("OK").green(), path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_is_readable() {
        let config = SdkConfig::default();
        for key in KEYS {
            assert!(get_setting_value(&config, key).is_some(), "{key}");
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut config = SdkConfig::default();
        set_setting_value(&mut config, "backend.api_url", "chat.example.com/").unwrap();
        assert_eq!(
            get_setting_value(&config, "backend.api_url").unwrap(),
            "https://chat.example.com"
        );
        assert_eq!(
            get_setting_value(&config, "backend.socket_url").unwrap(),
            "wss://chat.example.com/socket"
        );

        set_setting_value(&mut config, "realtime.max_reconnect_attempts", "0").unwrap();
        assert_eq!(config.realtime.max_reconnect_attempts, 0);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = SdkConfig::default();
        assert!(set_setting_value(&mut config, "realtime.jitter_factor", "2").is_err());
        assert!(set_setting_value(&mut config, "logging.level", "loud").is_err());
        assert!(set_setting_value(&mut config, "backend.api_timeout_ms", "soon").is_err());
        assert!(set_setting_value(&mut config, "nope", "1").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = SdkConfig::default();
        set_setting_value(&mut config, "logging.json_output", "true").unwrap();
        config.save_to_file(&path).unwrap();

        let loaded = SdkConfig::load_from_file(&path).unwrap();
        assert!(loaded.logging.json_output);
    }
}
