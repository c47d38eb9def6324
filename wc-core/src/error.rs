//! Error types for the WidgetChat SDK.
//!
//! Each caller-facing component fails with its own typed error (`ConfigError`,
//! `ValidationError`, `InitError`, `ConnError`, `PresentError`, `ThemeError`).
//! Infrastructure failures and the typed errors are unified into a single
//! `WcError` enum with conversions from underlying library errors.

use thiserror::Error;

use crate::constants::messages;

/// Convenience type alias for Results using WcError.
pub type WcResult<T> = Result<T, WcError>;

/// A malformed or missing field in a widget configuration.
///
/// Always raised synchronously, before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The visitor key does not have the fixed token length.
    #[error("visitor key must be {expected} characters, got {actual}")]
    VisitorKeyLength { expected: usize, actual: usize },

    /// The account id is zero or negative.
    #[error("account id must be positive, got {0}")]
    NonPositiveAccountId(i64),
}

/// Failure to validate bot/account/visitor credentials.
///
/// Remote failures carry the user-facing message configured on the widget
/// config (or the SDK default), which is also the Display output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Local checks rejected the config.
    #[error("invalid widget config: {0}")]
    Config(#[from] ConfigError),

    /// The backend rejected the request as malformed.
    #[error("{message}")]
    BadRequest { message: String },

    /// The bot exists but is not active.
    #[error("{message}")]
    BotNotActive { message: String },

    /// The backend could not be reached or replied unexpectedly.
    #[error("{message}")]
    Network { message: String, cause: String },
}

impl ValidationError {
    /// The human-readable message to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message }
            | Self::BotNotActive { message }
            | Self::Network { message, .. } => message.clone(),
            Self::Config(_) => messages::BAD_REQUEST.to_string(),
        }
    }

    /// Whether this failure happened before any network call.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Realtime connection failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnError {
    /// The backend rejected the socket auth token. Never retried.
    #[error("socket authentication failed: {0}")]
    AuthFailed(String),

    /// The socket endpoint could not be reached or dropped the connection.
    #[error("socket unreachable: {0}")]
    Unreachable(String),

    /// Connecting took longer than the configured timeout.
    #[error("socket connect timed out after {0}ms")]
    Timeout(u64),

    /// Automatic reconnection gave up.
    #[error("reconnection failed after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },

    /// The channel was closed while the operation was in flight.
    #[error("channel closed")]
    Closed,

    /// No connection has been established.
    #[error("channel not connected")]
    NotConnected,
}

impl ConnError {
    /// Whether reconnection should stop immediately on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailed(_) | Self::RetriesExhausted { .. } | Self::Closed)
    }
}

/// Session initialization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Credential validation failed (locally or remotely).
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The realtime channel could not be opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[from] ConnError),

    /// The backend did not issue a conversation key.
    #[error("conversation key unavailable: {0}")]
    KeyUnavailable(String),

    /// Another initialize call is still running.
    #[error("initialization already in progress")]
    AlreadyInProgress,

    /// The session was torn down while initializing.
    #[error("initialization cancelled")]
    Cancelled,
}

impl InitError {
    /// The human-readable message to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationFailed(e) => e.user_message(),
            _ => messages::NETWORK_ERROR.to_string(),
        }
    }
}

/// Failures launching conversation screens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    /// The SDK session is not initialized.
    #[error("sdk not initialized")]
    NotInitialized,

    /// A conversation key could not be obtained.
    #[error("conversation key unavailable: {0}")]
    KeyUnavailable(String),
}

/// Failures applying a theme.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThemeError {
    /// A slot holds something that is not a color.
    #[error("invalid color for {slot}: {value:?}")]
    InvalidColor { slot: String, value: String },
}

/// Unified error type covering all error categories in the SDK.
#[derive(Error, Debug)]
pub enum WcError {
    // -- Configuration errors --
    /// Failed to load or parse SDK configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Backend returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// Backend rejected the account credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    // -- SDK component errors --
    #[error(transparent)]
    WidgetConfig(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Conn(#[from] ConnError),

    #[error(transparent)]
    Present(#[from] PresentError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WcError {
    /// Whether this is a transport-level failure (as opposed to a rejection).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout(_) | Self::ServerError { .. }
        )
    }
}

impl From<serde_json::Error> for WcError {
    fn from(e: serde_json::Error) -> Self {
        WcError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for WcError {
    fn from(e: toml::de::Error) -> Self {
        WcError::Config(e.to_string())
    }
}
