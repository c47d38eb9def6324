//! The backend seam the service layer depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use wc_core::error::WcResult;
use wc_models::{ConversationKey, WidgetConfig};

/// Body of a credential validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub bot_id: String,
    pub account_id: i64,
    pub account_key: String,
    pub visitor_key: String,
}

impl From<&WidgetConfig> for ValidationRequest {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            bot_id: config.bot_id.clone(),
            account_id: config.account_id,
            account_key: config.account_key.clone(),
            visitor_key: config.visitor_key.clone(),
        }
    }
}

/// Body of a conversation creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub bot_id: String,
    pub account_id: i64,
    pub visitor_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<&WidgetConfig> for ConversationRequest {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            bot_id: config.bot_id.clone(),
            account_id: config.account_id,
            visitor_key: config.visitor_key.clone(),
            payload: config.payload.clone(),
        }
    }
}

/// Result of a remote credential check that reached the backend.
///
/// Transport failures are reported through the `Err` side of the call
/// instead, so callers can tell "rejected" apart from "unreachable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Credentials accepted; the token authenticates the realtime socket.
    Valid { token: String },
    /// The backend judged the request malformed.
    BadRequest { detail: String },
    /// The bot exists but is switched off.
    BotNotActive,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Operations the SDK needs from the chat backend.
#[async_trait]
pub trait WidgetBackend: Send + Sync {
    /// Check bot/account/visitor credentials.
    async fn validate_credentials(&self, request: &ValidationRequest)
        -> WcResult<ValidationOutcome>;

    /// Ask the backend to issue a new conversation key.
    async fn create_conversation(&self, request: &ConversationRequest)
        -> WcResult<ConversationKey>;

    /// Endpoint of the realtime socket.
    fn socket_endpoint(&self) -> String;
}
