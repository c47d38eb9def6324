//! Platform detection and OS-specific paths.

use std::path::PathBuf;

use crate::constants::APP_NAME;
use crate::error::{WcError, WcResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Linux
        }
    }

    /// Get the platform-specific SDK data directory (logs).
    pub fn data_dir() -> WcResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| WcError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> WcResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| WcError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Get a short platform name, sent in the User-Agent.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    /// User-Agent string identifying this SDK build.
    pub fn user_agent() -> String {
        format!(
            "widgetchat-sdk/{} ({})",
            crate::constants::SDK_VERSION,
            Self::current().name()
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let p = Platform::current();
        assert!(matches!(
            p,
            Platform::Windows | Platform::MacOs | Platform::Linux | Platform::Android | Platform::Ios
        ));
    }

    #[test]
    fn test_user_agent() {
        let ua = Platform::user_agent();
        assert!(ua.starts_with("widgetchat-sdk/"));
        assert!(ua.contains(Platform::current().name()));
    }
}
