//! Widget configuration supplied by the host application.

use serde::{Deserialize, Serialize};

use wc_core::constants::{messages, VISITOR_KEY_LENGTH};
use wc_core::error::ConfigError;

use super::conversation::ConversationKey;

/// Credentials and presentation options for one chat widget session.
///
/// Passed by value to `initialize` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Configured chat agent.
    pub bot_id: String,
    /// Per-end-user token identifying the chat participant.
    pub visitor_key: String,
    /// Account secret key.
    pub account_key: String,
    /// Numeric account id.
    pub account_id: i64,
    /// Existing conversation to resume; the backend issues one when absent.
    #[serde(default)]
    pub conversation_key: Option<ConversationKey>,
    /// Display flags copied into every screen descriptor.
    #[serde(default)]
    pub display: DisplayFlags,
    /// Opaque key-value payload forwarded to the backend on conversation creation.
    #[serde(default)]
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
    /// User-facing error messages.
    #[serde(default)]
    pub messages: ErrorMessages,
}

/// Boolean presentation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFlags {
    #[serde(default = "default_true")]
    pub show_header: bool,
    #[serde(default = "default_true")]
    pub show_bot_avatar: bool,
    #[serde(default = "default_true")]
    pub enable_attachments: bool,
    #[serde(default)]
    pub show_timestamps: bool,
}

/// Messages surfaced to the end user when initialization fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessages {
    #[serde(default)]
    pub bad_request_message: Option<String>,
    #[serde(default)]
    pub bot_not_active_message: Option<String>,
    #[serde(default)]
    pub network_error_message: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            show_header: true,
            show_bot_avatar: true,
            enable_attachments: true,
            show_timestamps: false,
        }
    }
}

impl ErrorMessages {
    pub fn bad_request(&self) -> String {
        self.bad_request_message
            .clone()
            .unwrap_or_else(|| messages::BAD_REQUEST.to_string())
    }

    pub fn bot_not_active(&self) -> String {
        self.bot_not_active_message
            .clone()
            .unwrap_or_else(|| messages::BOT_NOT_ACTIVE.to_string())
    }

    pub fn network_error(&self) -> String {
        self.network_error_message
            .clone()
            .unwrap_or_else(|| messages::NETWORK_ERROR.to_string())
    }
}

impl WidgetConfig {
    /// Create a config with the four required credentials and default options.
    pub fn new(
        bot_id: impl Into<String>,
        visitor_key: impl Into<String>,
        account_key: impl Into<String>,
        account_id: i64,
    ) -> Self {
        Self {
            bot_id: bot_id.into(),
            visitor_key: visitor_key.into(),
            account_key: account_key.into(),
            account_id,
            conversation_key: None,
            display: DisplayFlags::default(),
            payload: None,
            messages: ErrorMessages::default(),
        }
    }

    pub fn with_conversation_key(mut self, key: impl Into<ConversationKey>) -> Self {
        self.conversation_key = Some(key.into());
        self
    }

    pub fn with_display(mut self, display: DisplayFlags) -> Self {
        self.display = display;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_bad_request_message(mut self, message: impl Into<String>) -> Self {
        self.messages.bad_request_message = Some(message.into());
        self
    }

    pub fn with_bot_not_active_message(mut self, message: impl Into<String>) -> Self {
        self.messages.bot_not_active_message = Some(message.into());
        self
    }

    pub fn with_network_error_message(mut self, message: impl Into<String>) -> Self {
        self.messages.network_error_message = Some(message.into());
        self
    }

    /// Supplied conversation key, ignoring blank values.
    pub fn supplied_conversation_key(&self) -> Option<&ConversationKey> {
        self.conversation_key.as_ref().filter(|k| !k.is_blank())
    }

    /// Synchronous well-formedness checks run before any network call.
    pub fn validate_local(&self) -> Result<(), ConfigError> {
        if self.bot_id.trim().is_empty() {
            return Err(ConfigError::MissingField("botId"));
        }
        if self.account_key.trim().is_empty() {
            return Err(ConfigError::MissingField("accountKey"));
        }
        if self.visitor_key.trim().is_empty() {
            return Err(ConfigError::MissingField("visitorKey"));
        }
        let len = self.visitor_key.chars().count();
        if len != VISITOR_KEY_LENGTH {
            return Err(ConfigError::VisitorKeyLength {
                expected: VISITOR_KEY_LENGTH,
                actual: len,
            });
        }
        if self.account_id <= 0 {
            return Err(ConfigError::NonPositiveAccountId(self.account_id));
        }
        Ok(())
    }
}
