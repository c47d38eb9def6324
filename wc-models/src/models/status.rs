//! Session and validation status enums.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the SDK session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    /// `initialize` has not been called, or the session was torn down.
    NotInitialized,
    /// An `initialize` call is running.
    Initializing,
    /// Credentials validated and the realtime channel is open.
    Initialized,
    /// Initialization (or the live session) failed.
    InitializationFailed(String),
}

impl SessionState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Initializing)
    }

    /// The failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::InitializationFailed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not_initialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Initialized => write!(f, "initialized"),
            Self::InitializationFailed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Result of the backend credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ValidationState {
    NotValidated,
    Validating,
    Validated,
    ValidationFailed(String),
}

impl ValidationState {
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

impl std::fmt::Display for ValidationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotValidated => write!(f, "not_validated"),
            Self::Validating => write!(f, "validating"),
            Self::Validated => write!(f, "validated"),
            Self::ValidationFailed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_helpers() {
        assert!(SessionState::Initialized.is_initialized());
        assert!(SessionState::Initializing.is_in_progress());
        assert_eq!(
            SessionState::InitializationFailed("boom".into()).failure_reason(),
            Some("boom")
        );
        assert_eq!(SessionState::NotInitialized.failure_reason(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Initializing.to_string(), "initializing");
        assert_eq!(
            ValidationState::ValidationFailed("bot inactive".into()).to_string(),
            "failed (bot inactive)"
        );
    }

    #[test]
    fn test_tagged_serde() {
        let json = serde_json::to_value(SessionState::InitializationFailed("x".into())).unwrap();
        assert_eq!(json["state"], "initialization_failed");
        assert_eq!(json["reason"], "x");
        let json = serde_json::to_value(ValidationState::Validated).unwrap();
        assert_eq!(json["state"], "validated");
    }
}
