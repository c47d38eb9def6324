//! Credential validation.
//!
//! Runs the synchronous well-formedness checks first, then asks the backend
//! whether the bot/account/visitor combination is valid. Results are never
//! cached: every call re-runs the remote check.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use wc_api::{ValidationOutcome, ValidationRequest, WidgetBackend};
use wc_core::error::{ValidationError, WcError};
use wc_models::{ValidationState, WidgetConfig};

use crate::event_bus::{EventBus, SdkEvent};

/// Proof of a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCredentials {
    pub bot_id: String,
    pub account_id: i64,
    /// Token that authenticates the realtime channel.
    pub token: String,
    pub validated_at: DateTime<Utc>,
}

pub struct CredentialValidator {
    backend: Arc<dyn WidgetBackend>,
    event_bus: EventBus,
    state: RwLock<ValidationState>,
}

impl CredentialValidator {
    pub fn new(backend: Arc<dyn WidgetBackend>, event_bus: EventBus) -> Self {
        Self {
            backend,
            event_bus,
            state: RwLock::new(ValidationState::NotValidated),
        }
    }

    pub fn state(&self) -> ValidationState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_validated(&self) -> bool {
        self.state().is_validated()
    }

    /// Forget the last result.
    pub fn reset(&self) {
        self.set_state(ValidationState::NotValidated);
    }

    fn set_state(&self, new_state: ValidationState) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == new_state {
                return;
            }
            *state = new_state.clone();
        }
        self.event_bus
            .emit(SdkEvent::ValidationStateChanged { state: new_state });
    }

    fn fail(&self, err: ValidationError) -> ValidationError {
        self.set_state(ValidationState::ValidationFailed(err.to_string()));
        err
    }

    /// Validate `config`, locally and then against the backend.
    ///
    /// Local failures return before any network call.
    pub async fn validate(
        &self,
        config: &WidgetConfig,
    ) -> Result<ValidatedCredentials, ValidationError> {
        if let Err(e) = config.validate_local() {
            warn!("widget config rejected: {e}");
            return Err(self.fail(e.into()));
        }

        self.set_state(ValidationState::Validating);
        let request = ValidationRequest::from(config);

        let outcome = match self.backend.validate_credentials(&request).await {
            Ok(outcome) => outcome,
            // The backend refused the account itself.
            Err(WcError::AuthFailed(detail)) => ValidationOutcome::BadRequest { detail },
            Err(e) => {
                warn!("credential check failed: {e}");
                return Err(self.fail(ValidationError::Network {
                    message: config.messages.network_error(),
                    cause: e.to_string(),
                }));
            }
        };

        match outcome {
            ValidationOutcome::Valid { token } => {
                self.set_state(ValidationState::Validated);
                info!(bot_id = %config.bot_id, "credentials validated");
                Ok(ValidatedCredentials {
                    bot_id: config.bot_id.clone(),
                    account_id: config.account_id,
                    token,
                    validated_at: Utc::now(),
                })
            }
            ValidationOutcome::BadRequest { detail } => {
                warn!(bot_id = %config.bot_id, "credentials rejected: {detail}");
                Err(self.fail(ValidationError::BadRequest {
                    message: config.messages.bad_request(),
                }))
            }
            ValidationOutcome::BotNotActive => {
                warn!(bot_id = %config.bot_id, "bot is not active");
                Err(self.fail(ValidationError::BotNotActive {
                    message: config.messages.bot_not_active(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use wc_api::ConversationRequest;
    use wc_core::constants::messages;
    use wc_core::error::{ConfigError, WcResult};
    use wc_models::ConversationKey;

    struct ScriptedBackend {
        reply: Mutex<Option<WcResult<ValidationOutcome>>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(reply: WcResult<ValidationOutcome>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WidgetBackend for ScriptedBackend {
        async fn validate_credentials(
            &self,
            _request: &ValidationRequest,
        ) -> WcResult<ValidationOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply.lock().unwrap().take() {
                Some(reply) => reply,
                None => Ok(ValidationOutcome::Valid { token: "again".into() }),
            }
        }

        async fn create_conversation(
            &self,
            _request: &ConversationRequest,
        ) -> WcResult<ConversationKey> {
            Ok(ConversationKey::new("conv-1"))
        }

        fn socket_endpoint(&self) -> String {
            "mem://chat".into()
        }
    }

    fn config() -> WidgetConfig {
        WidgetConfig::new("b1", "v".repeat(32), "k1", 42)
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::Valid { token: "t1".into() }));
        let validator = CredentialValidator::new(backend.clone(), EventBus::new(8));

        let creds = validator.validate(&config()).await.unwrap();
        assert_eq!(creds.token, "t1");
        assert_eq!(creds.account_id, 42);
        assert!(validator.is_validated());
    }

    #[tokio::test]
    async fn test_local_failure_makes_no_call() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::Valid { token: "t1".into() }));
        let validator = CredentialValidator::new(backend.clone(), EventBus::new(8));

        let mut bad = config();
        bad.account_id = 0;
        let err = validator.validate(&bad).await.unwrap_err();
        assert_eq!(err, ValidationError::Config(ConfigError::NonPositiveAccountId(0)));
        assert!(validator.state().is_failed());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bot_not_active_uses_configured_message() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::BotNotActive));
        let validator = CredentialValidator::new(backend, EventBus::new(8));

        let cfg = config().with_bot_not_active_message("Bot is on a break");
        let err = validator.validate(&cfg).await.unwrap_err();
        assert_eq!(err.user_message(), "Bot is on a break");
        assert_eq!(
            validator.state(),
            ValidationState::ValidationFailed("Bot is on a break".into())
        );
    }

    #[tokio::test]
    async fn test_bad_request_falls_back_to_default_message() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::BadRequest {
            detail: "unknown account".into(),
        }));
        let validator = CredentialValidator::new(backend, EventBus::new(8));
        let err = validator.validate(&config()).await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::BadRequest {
                message: messages::BAD_REQUEST.into()
            }
        );
    }

    #[tokio::test]
    async fn test_auth_rejection_is_bad_request() {
        let backend = ScriptedBackend::new(Err(WcError::AuthFailed("401".into())));
        let validator = CredentialValidator::new(backend, EventBus::new(8));
        let err = validator.validate(&config()).await.unwrap_err();
        assert!(matches!(err, ValidationError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let backend = ScriptedBackend::new(Err(WcError::Timeout("slow".into())));
        let validator = CredentialValidator::new(backend, EventBus::new(8));
        let cfg = config().with_network_error_message("Offline");
        match validator.validate(&cfg).await.unwrap_err() {
            ValidationError::Network { message, cause } => {
                assert_eq!(message, "Offline");
                assert!(cause.contains("slow"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_cached() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::Valid { token: "t1".into() }));
        let validator = CredentialValidator::new(backend.clone(), EventBus::new(8));
        validator.validate(&config()).await.unwrap();
        let second = validator.validate(&config()).await.unwrap();
        assert_eq!(second.token, "again");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_state_changes_are_emitted() {
        let backend = ScriptedBackend::new(Ok(ValidationOutcome::Valid { token: "t1".into() }));
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let validator = CredentialValidator::new(backend, bus);
        validator.validate(&config()).await.unwrap();

        let mut states = Vec::new();
        while let Ok(SdkEvent::ValidationStateChanged { state }) = rx.try_recv() {
            states.push(state);
        }
        assert_eq!(
            states,
            vec![ValidationState::Validating, ValidationState::Validated]
        );
    }
}
