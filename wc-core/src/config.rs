//! SDK configuration management.
//!
//! Handles loading, saving, and accessing the SDK configuration: backend
//! endpoints, realtime channel tuning, and logging. Configuration is
//! persisted as TOML on disk. Widget credentials are not part of this file;
//! they are passed to `initialize` by the host application.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{WcError, WcResult};
use crate::platform::Platform;

/// Top-level SDK configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// HTTPS API base URL (e.g., "https://chat.example.com").
    #[serde(default)]
    pub api_url: String,

    /// Realtime socket URL (e.g., "wss://chat.example.com/socket").
    /// Derived from `api_url` when empty.
    #[serde(default)]
    pub socket_url: String,

    /// Custom HTTP headers as key-value pairs.
    #[serde(default)]
    pub custom_headers: std::collections::HashMap<String, String>,

    /// API request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,

    /// Whether to accept self-signed TLS certificates (development backends).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Realtime channel tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// First reconnect delay in milliseconds; doubles per attempt.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,

    /// Cap on the reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,

    /// Reconnect attempts before the channel gives up (0 = unlimited).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Jitter factor (0.0 to 1.0) applied to each reconnect delay.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Timeout for a single connect attempt in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Interval between heartbeat pings in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,

    /// Unanswered pings before the connection is considered dead.
    #[serde(default = "default_max_missed_pings")]
    pub max_missed_pings: u32,

    /// Capacity of the inbound event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_reconnect_base_delay() -> u64 {
    1_000
}

fn default_reconnect_max_delay() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_jitter_factor() -> f64 {
    0.3
}

fn default_connect_timeout() -> u64 {
    15_000
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_max_missed_pings() -> u32 {
    3
}

fn default_event_capacity() -> usize {
    constants::DEFAULT_EVENT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            socket_url: String::new(),
            custom_headers: std::collections::HashMap::new(),
            api_timeout_ms: default_api_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            jitter_factor: default_jitter_factor(),
            connect_timeout_ms: default_connect_timeout(),
            ping_interval_ms: default_ping_interval(),
            max_missed_pings: default_max_missed_pings(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl BackendConfig {
    /// The socket URL to use, deriving `ws(s)://<api host>/socket` when unset.
    pub fn effective_socket_url(&self) -> String {
        if !self.socket_url.trim().is_empty() {
            return SdkConfig::sanitize_url(&self.socket_url);
        }
        let api = SdkConfig::sanitize_url(&self.api_url);
        let ws = if let Some(rest) = api.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = api.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            api
        };
        format!("{ws}/socket")
    }
}

impl SdkConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> WcResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> WcResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SdkConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> WcResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| WcError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> WcResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> WcResult<PathBuf> {
        if self.logging.directory.is_empty() {
            let data_dir = Platform::data_dir()?;
            Ok(data_dir.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Check whether the backend endpoint is configured.
    pub fn is_backend_configured(&self) -> bool {
        !self.backend.api_url.trim().is_empty()
    }

    /// Sanitize and normalize a backend URL.
    ///
    /// Strips quotes and trailing slashes and defaults to https when no
    /// scheme is given. Socket schemes (ws/wss) are preserved.
    pub fn sanitize_url(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| trimmed.starts_with(scheme))
        {
            trimmed.to_string()
        } else if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
            format!("http://{trimmed}")
        } else {
            format!("https://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.backend.api_timeout_ms, 30_000);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.reconnect_base_delay_ms, 1_000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.is_backend_configured());
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            SdkConfig::sanitize_url("chat.example.com/"),
            "https://chat.example.com"
        );
        assert_eq!(
            SdkConfig::sanitize_url("  \"http://localhost:8080/\"  "),
            "http://localhost:8080"
        );
        assert_eq!(
            SdkConfig::sanitize_url("localhost:8080"),
            "http://localhost:8080"
        );
        assert_eq!(
            SdkConfig::sanitize_url("wss://chat.example.com/socket/"),
            "wss://chat.example.com/socket"
        );
        assert_eq!(SdkConfig::sanitize_url("   "), "");
    }

    #[test]
    fn test_effective_socket_url() {
        let mut backend = BackendConfig {
            api_url: "https://chat.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(backend.effective_socket_url(), "wss://chat.example.com/socket");

        backend.api_url = "http://localhost:8080".into();
        assert_eq!(backend.effective_socket_url(), "ws://localhost:8080/socket");

        backend.socket_url = "wss://rt.example.com/v2".into();
        assert_eq!(backend.effective_socket_url(), "wss://rt.example.com/v2");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SdkConfig = toml::from_str(
            r#"
            [backend]
            api_url = "https://chat.example.com"

            [realtime]
            max_reconnect_attempts = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.api_url, "https://chat.example.com");
        assert_eq!(config.backend.api_timeout_ms, 30_000);
        assert_eq!(config.realtime.max_reconnect_attempts, 8);
        assert_eq!(config.realtime.max_missed_pings, 3);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SdkConfig::default();
        config.backend.api_url = "https://chat.example.com".into();
        config.realtime.jitter_factor = 0.0;
        config.save_to_file(&path).unwrap();

        let loaded = SdkConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.backend.api_url, "https://chat.example.com");
        assert_eq!(loaded.realtime.jitter_factor, 0.0);
    }
}
