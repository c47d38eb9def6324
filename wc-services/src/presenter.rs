//! Conversation screen presentation.
//!
//! Produces `ScreenDescriptor` values for the host UI. Every descriptor
//! carries its own copy of the theme, so later theme changes never restyle
//! a screen that was already described.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use wc_api::ConversationRequest;
use wc_core::error::PresentError;
use wc_models::{ConversationKey, ScreenDescriptor, ScreenKind, WidgetConfig};

use crate::event_bus::{EventBus, SdkEvent};
use crate::session::SessionManager;
use crate::theme::ThemeStore;

pub struct ConversationPresenter {
    session: Arc<SessionManager>,
    themes: Arc<ThemeStore>,
    event_bus: EventBus,
    /// Serializes conversation key requests so concurrent callers share one.
    key_request: Mutex<()>,
    presented: StdMutex<Vec<ScreenDescriptor>>,
}

impl ConversationPresenter {
    pub fn new(session: Arc<SessionManager>, themes: Arc<ThemeStore>, event_bus: EventBus) -> Self {
        Self {
            session,
            themes,
            event_bus,
            key_request: Mutex::new(()),
            presented: StdMutex::new(Vec::new()),
        }
    }

    fn session_config(&self) -> Result<WidgetConfig, PresentError> {
        if !self.session.is_initialized() {
            return Err(PresentError::NotInitialized);
        }
        self.session.config().ok_or(PresentError::NotInitialized)
    }

    fn describe(
        &self,
        kind: ScreenKind,
        key: Option<ConversationKey>,
    ) -> Result<ScreenDescriptor, PresentError> {
        let config = self.session_config()?;
        let descriptor = ScreenDescriptor::new(
            kind,
            config.bot_id,
            key,
            self.themes.effective_theme(),
            config.display,
        );
        debug!("described {} screen {}", descriptor.kind, descriptor.id);
        Ok(descriptor)
    }

    pub fn launch_conversation_list_full_screen(&self) -> Result<ScreenDescriptor, PresentError> {
        self.describe(
            ScreenKind::ConversationListFullScreen,
            self.session.conversation_key(),
        )
    }

    pub fn launch_conversation_list_bottom_sheet(&self) -> Result<ScreenDescriptor, PresentError> {
        self.describe(
            ScreenKind::ConversationListBottomSheet,
            self.session.conversation_key(),
        )
    }

    /// Describe the detail screen of an existing conversation.
    pub fn launch_conversation(
        &self,
        conversation_id: impl Into<ConversationKey>,
    ) -> Result<ScreenDescriptor, PresentError> {
        let key = conversation_id.into();
        self.session_config()?;
        if key.is_blank() {
            return Err(PresentError::KeyUnavailable("empty conversation id".into()));
        }
        self.describe(ScreenKind::ConversationDetail, Some(key))
    }

    /// Return the session's conversation key, requesting one from the
    /// backend first if the session has none.
    ///
    /// Once a key exists no further backend calls are made; concurrent
    /// callers wait for the same request.
    pub async fn open_conversation_detail_screen_without_key(
        &self,
    ) -> Result<ConversationKey, PresentError> {
        let config = self.session_config()?;
        if let Some(key) = self.session.conversation_key() {
            return Ok(key);
        }

        let _guard = self.key_request.lock().await;
        if let Some(key) = self.session.conversation_key() {
            return Ok(key);
        }
        if !self.session.is_initialized() {
            return Err(PresentError::NotInitialized);
        }

        info!(bot_id = %config.bot_id, "requesting a conversation key");
        let key = self
            .session
            .backend()
            .create_conversation(&ConversationRequest::from(&config))
            .await
            .map_err(|e| {
                warn!("conversation key request failed: {e}");
                PresentError::KeyUnavailable(e.to_string())
            })?;
        self.session.set_conversation_key(key.clone());
        Ok(key)
    }

    /// Describe the bottom-sheet list and record it as presented.
    pub fn present_bottom_sheet_conversation_list(&self) -> Result<ScreenDescriptor, PresentError> {
        let descriptor = self.launch_conversation_list_bottom_sheet()?;
        self.presented
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(descriptor.clone());
        self.event_bus.emit(SdkEvent::ScreenPresented {
            descriptor: Box::new(descriptor.clone()),
        });
        Ok(descriptor)
    }

    /// Screens presented so far, oldest first.
    pub fn presented_screens(&self) -> Vec<ScreenDescriptor> {
        self.presented
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
