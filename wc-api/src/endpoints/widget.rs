//! Widget session endpoints: credential validation and conversation issuance.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use wc_core::error::{WcError, WcResult};
use wc_models::ConversationKey;

use crate::backend::{ConversationRequest, ValidationOutcome, ValidationRequest, WidgetBackend};
use crate::client::ApiClient;
use crate::response::ServerResponse;

/// Status values reported by the validation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    BadRequest,
    BotNotActive,
}

/// `data` payload of a validation response.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationData {
    pub status: ValidationStatus,
    #[serde(default)]
    pub token: Option<String>,
}

/// `data` payload of a conversation creation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    pub conversation_key: String,
}

/// Map a validation envelope onto an outcome.
fn interpret_validation(resp: ServerResponse<ValidationData>) -> WcResult<ValidationOutcome> {
    if resp.status == 400 {
        let detail = resp.error_message().unwrap_or_default();
        return Ok(ValidationOutcome::BadRequest { detail });
    }
    if resp.is_error() {
        return Err(WcError::ServerError {
            status: resp.status,
            message: resp.error_message().unwrap_or_default(),
        });
    }
    let detail = resp.message.clone();
    let data = resp
        .into_data()
        .map_err(|e| WcError::Serialization(format!("validation response: {e}")))?;

    match data.status {
        ValidationStatus::Valid => match data.token {
            Some(token) if !token.is_empty() => Ok(ValidationOutcome::Valid { token }),
            _ => Err(WcError::Serialization(
                "validation response is missing the socket token".into(),
            )),
        },
        ValidationStatus::BadRequest => Ok(ValidationOutcome::BadRequest { detail }),
        ValidationStatus::BotNotActive => Ok(ValidationOutcome::BotNotActive),
    }
}

fn interpret_conversation(resp: ServerResponse<ConversationData>) -> WcResult<ConversationKey> {
    if resp.is_error() {
        return Err(WcError::ServerError {
            status: resp.status,
            message: resp.error_message().unwrap_or_default(),
        });
    }
    let data = resp
        .into_data()
        .map_err(|e| WcError::Serialization(format!("conversation response: {e}")))?;
    let key = ConversationKey::new(data.conversation_key);
    if key.is_blank() {
        return Err(WcError::Serialization("backend issued a blank conversation key".into()));
    }
    Ok(key)
}

impl ApiClient {
    /// Validate bot, account and visitor credentials.
    pub async fn validate_widget(&self, request: &ValidationRequest) -> WcResult<ValidationOutcome> {
        let body = serde_json::to_value(request)?;
        let response = self.post("/widget/validate", &body).await?;
        if response.status() == StatusCode::BAD_REQUEST {
            let detail = response.text().await.unwrap_or_default();
            debug!(bot_id = %request.bot_id, "credential check rejected: {detail}");
            return Ok(ValidationOutcome::BadRequest { detail });
        }
        let resp: ServerResponse<ValidationData> = ApiClient::parse_response(response).await?;
        let outcome = interpret_validation(resp)?;
        debug!(bot_id = %request.bot_id, valid = outcome.is_valid(), "credential check finished");
        Ok(outcome)
    }

    /// Request a new conversation key for this visitor.
    pub async fn create_widget_conversation(
        &self,
        request: &ConversationRequest,
    ) -> WcResult<ConversationKey> {
        let body = serde_json::to_value(request)?;
        let resp: ServerResponse<ConversationData> =
            self.post_json("/widget/conversations", &body).await?;
        let key = interpret_conversation(resp)?;
        info!(bot_id = %request.bot_id, conversation = %key, "conversation issued");
        Ok(key)
    }
}

#[async_trait]
impl WidgetBackend for ApiClient {
    async fn validate_credentials(
        &self,
        request: &ValidationRequest,
    ) -> WcResult<ValidationOutcome> {
        self.validate_widget(request).await
    }

    async fn create_conversation(
        &self,
        request: &ConversationRequest,
    ) -> WcResult<ConversationKey> {
        self.create_widget_conversation(request).await
    }

    fn socket_endpoint(&self) -> String {
        self.socket_url().to_string()
    }
}
