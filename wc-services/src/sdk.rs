//! The `ChatWidget` facade.
//!
//! One object per SDK instance. It owns a single session, the theme store
//! and the presenter, and exposes the calls a host application makes.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use wc_api::{ApiClient, WidgetBackend};
use wc_core::config::{RealtimeConfig, SdkConfig};
use wc_core::constants::events;
use wc_core::error::{ConnError, InitError, PresentError, ThemeError, WcError, WcResult};
use wc_models::{ConversationKey, ResolvedTheme, ScreenDescriptor, SessionState, WidgetConfig, WidgetTheme};
use wc_socket::{ChannelConfig, ConnectionState, RealtimeChannel, Transport, WebSocketTransport};

use crate::event_bus::{EventBus, SdkEvent};
use crate::presenter::ConversationPresenter;
use crate::session::SessionManager;
use crate::theme::ThemeStore;

pub struct ChatWidget {
    event_bus: EventBus,
    session: Arc<SessionManager>,
    themes: Arc<ThemeStore>,
    presenter: ConversationPresenter,
}

impl ChatWidget {
    /// Build a widget that talks to the backend described by `config`.
    pub fn new(config: &SdkConfig) -> WcResult<Self> {
        if !config.is_backend_configured() {
            return Err(WcError::MissingConfig("backend.api_url".into()));
        }
        let client = ApiClient::new(&config.backend)?;
        Ok(Self::with_parts(
            Arc::new(client),
            Arc::new(WebSocketTransport::new()),
            &config.realtime,
        ))
    }

    /// Build a widget from explicit parts.
    pub fn with_parts(
        backend: Arc<dyn WidgetBackend>,
        transport: Arc<dyn Transport>,
        realtime: &RealtimeConfig,
    ) -> Self {
        let event_bus = EventBus::new(realtime.event_capacity.max(1));
        let channel = Arc::new(RealtimeChannel::new(transport, ChannelConfig::from(realtime)));
        let session = Arc::new(SessionManager::new(backend, channel, event_bus.clone()));
        let themes = Arc::new(ThemeStore::new(event_bus.clone()));
        let presenter = ConversationPresenter::new(
            Arc::clone(&session),
            Arc::clone(&themes),
            event_bus.clone(),
        );
        Self {
            event_bus,
            session,
            themes,
            presenter,
        }
    }

    pub async fn initialize(&self, config: WidgetConfig) -> Result<(), InitError> {
        self.session.initialize(config).await
    }

    pub fn is_sdk_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn is_bot_validated(&self) -> bool {
        self.session.is_bot_validated()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn set_theme(&self, theme: WidgetTheme) -> Result<ResolvedTheme, ThemeError> {
        self.themes.set_theme(theme)
    }

    pub fn get_theme(&self) -> Option<ResolvedTheme> {
        self.themes.get_theme()
    }

    pub fn launch_conversation_list_full_screen(&self) -> Result<ScreenDescriptor, PresentError> {
        self.presenter.launch_conversation_list_full_screen()
    }

    pub fn launch_conversation_list_bottom_sheet(&self) -> Result<ScreenDescriptor, PresentError> {
        self.presenter.launch_conversation_list_bottom_sheet()
    }

    pub fn launch_conversation(
        &self,
        conversation_id: impl Into<ConversationKey>,
    ) -> Result<ScreenDescriptor, PresentError> {
        self.presenter.launch_conversation(conversation_id)
    }

    pub async fn open_conversation_detail_screen_without_key(
        &self,
    ) -> Result<ConversationKey, PresentError> {
        self.presenter
            .open_conversation_detail_screen_without_key()
            .await
    }

    pub fn present_bottom_sheet_conversation_list(&self) -> Result<ScreenDescriptor, PresentError> {
        self.presenter.present_bottom_sheet_conversation_list()
    }

    pub fn presented_screens(&self) -> Vec<ScreenDescriptor> {
        self.presenter.presented_screens()
    }

    /// Queue a text message on the current conversation.
    ///
    /// Returns the client-side id attached to the frame. The message is
    /// delivered once the channel is (re)connected.
    pub fn send_message(&self, text: &str) -> WcResult<String> {
        if !self.session.is_initialized() {
            return Err(PresentError::NotInitialized.into());
        }
        let key = self
            .session
            .conversation_key()
            .ok_or_else(|| PresentError::KeyUnavailable("no active conversation".into()))?;

        let client_id = Uuid::new_v4().to_string();
        self.session.channel().send(
            events::SEND_MESSAGE,
            json!({
                "conversationKey": key.as_str(),
                "text": text,
                "clientId": client_id,
            }),
        )?;
        debug!(conversation = %key, "queued message {client_id}");
        Ok(client_id)
    }

    /// Stream of SDK events.
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.event_bus.subscribe()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn channel_state(&self) -> ConnectionState {
        self.session.channel().state()
    }

    pub fn last_channel_error(&self) -> Option<ConnError> {
        self.session.channel().last_error()
    }

    /// End the session. The widget can be initialized again afterwards.
    pub async fn teardown(&self) {
        self.session.teardown().await;
        info!("chat widget torn down");
    }
}
