//! Session lifecycle.
//!
//! The SessionManager owns the session state, the realtime channel and the
//! conversation key. It serializes `initialize` calls, supervises the
//! channel once the session is up, and tears everything down on request.
//!
//! State machine:
//! NotInitialized -> Initializing -> Initialized | InitializationFailed

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use wc_api::{ConversationRequest, WidgetBackend};
use wc_core::error::{ConnError, InitError};
use wc_models::{ConversationKey, SessionState, ValidationState, WidgetConfig};
use wc_socket::{ChannelEventType, ConnectionState, InboundEvent, RealtimeChannel};

use crate::event_bus::{EventBus, SdkEvent};
use crate::validator::CredentialValidator;

type SharedState = Arc<RwLock<SessionState>>;
type SharedKey = Arc<RwLock<Option<ConversationKey>>>;

pub struct SessionManager {
    validator: CredentialValidator,
    backend: Arc<dyn WidgetBackend>,
    channel: Arc<RealtimeChannel>,
    event_bus: EventBus,
    state: SharedState,
    conversation_key: SharedKey,
    config: RwLock<Option<WidgetConfig>>,
    /// Bumped by `teardown` to cancel an in-flight initialize.
    cancel_tx: watch::Sender<u64>,
    /// Held by a running initialize; teardown takes it before cleaning up.
    lifecycle: AsyncMutex<()>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn WidgetBackend>,
        channel: Arc<RealtimeChannel>,
        event_bus: EventBus,
    ) -> Self {
        let state: SharedState = Arc::new(RwLock::new(SessionState::NotInitialized));
        let conversation_key: SharedKey = Arc::new(RwLock::new(None));
        let (cancel_tx, _) = watch::channel(0u64);

        let bus = event_bus.clone();
        let key = Arc::clone(&conversation_key);
        channel.add_listener(move |event| forward_inbound(&bus, &key, event));

        Self {
            validator: CredentialValidator::new(Arc::clone(&backend), event_bus.clone()),
            backend,
            channel,
            event_bus,
            state,
            conversation_key,
            config: RwLock::new(None),
            cancel_tx,
            lifecycle: AsyncMutex::new(()),
            supervisor: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }

    pub fn validation_state(&self) -> ValidationState {
        self.validator.state()
    }

    pub fn is_bot_validated(&self) -> bool {
        self.validator.is_validated()
    }

    pub fn channel(&self) -> &Arc<RealtimeChannel> {
        &self.channel
    }

    pub fn backend(&self) -> &Arc<dyn WidgetBackend> {
        &self.backend
    }

    /// The config of the current session.
    pub fn config(&self) -> Option<WidgetConfig> {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn conversation_key(&self) -> Option<ConversationKey> {
        self.conversation_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store the conversation key for this session.
    pub fn set_conversation_key(&self, key: ConversationKey) {
        *self
            .conversation_key
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(key.clone());
        info!(conversation = %key, "conversation key assigned");
        self.event_bus.emit(SdkEvent::ConversationKeyAssigned { key });
    }

    /// Forget the conversation key; the next detail screen starts a new one.
    pub fn clear_conversation_key(&self) {
        self.conversation_key
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    fn set_state(&self, new_state: SessionState) {
        set_shared_state(&self.state, &self.event_bus, new_state);
    }

    /// Validate credentials, open the realtime channel and make sure a
    /// conversation key exists.
    ///
    /// Fails fast with `AlreadyInProgress` while another call is running
    /// and succeeds without doing anything once initialized. Any failure
    /// closes the channel and leaves the session `InitializationFailed`.
    pub async fn initialize(&self, config: WidgetConfig) -> Result<(), InitError> {
        let (mut cancel_rx, generation) = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            match *state {
                SessionState::Initializing => return Err(InitError::AlreadyInProgress),
                SessionState::Initialized => return Ok(()),
                _ => {}
            }
            *state = SessionState::Initializing;
            let cancel_rx = self.cancel_tx.subscribe();
            let generation = *cancel_rx.borrow();
            (cancel_rx, generation)
        };
        self.event_bus.emit(SdkEvent::SessionStateChanged {
            state: SessionState::Initializing,
        });
        info!(bot_id = %config.bot_id, "initializing session");

        let _lifecycle = self.lifecycle.lock().await;

        let result = tokio::select! {
            biased;
            _ = cancel_rx.changed() => Err(InitError::Cancelled),
            result = self.establish(&config, generation) => result,
        };

        let cancelled = || *self.cancel_tx.borrow() != generation;
        if cancelled() {
            // teardown() owns the state and the channel from here.
            info!("initialize cancelled by teardown");
            return Err(InitError::Cancelled);
        }

        let key = match result {
            Ok(key) => key,
            Err(err) => return self.fail_initialize(err, generation).await,
        };

        let committed = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if cancelled() {
                return Err(InitError::Cancelled);
            }
            let channel_failed = self.channel.state() == ConnectionState::Failed;
            if !channel_failed {
                *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
                *self
                    .conversation_key
                    .write()
                    .unwrap_or_else(|e| e.into_inner()) = Some(key.clone());
                *state = SessionState::Initialized;
            }
            !channel_failed
        };
        if !committed {
            let conn_err = self.channel.last_error().unwrap_or(ConnError::NotConnected);
            return self
                .fail_initialize(InitError::ConnectionFailed(conn_err), generation)
                .await;
        }

        info!(conversation = %key, "session initialized");
        self.event_bus
            .emit(SdkEvent::ConversationKeyAssigned { key });
        self.event_bus.emit(SdkEvent::SessionStateChanged {
            state: SessionState::Initialized,
        });
        self.spawn_supervisor();
        Ok(())
    }

    async fn fail_initialize(&self, err: InitError, generation: u64) -> Result<(), InitError> {
        error!("initialization failed: {err}");
        self.channel.close().await;
        let failed = SessionState::InitializationFailed(err.to_string());
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *self.cancel_tx.borrow() != generation {
                return Err(InitError::Cancelled);
            }
            *state = failed.clone();
        }
        self.event_bus
            .emit(SdkEvent::SessionStateChanged { state: failed });
        Err(err)
    }

    async fn establish(
        &self,
        config: &WidgetConfig,
        generation: u64,
    ) -> Result<ConversationKey, InitError> {
        let credentials = self.validator.validate(config).await?;
        if *self.cancel_tx.borrow() != generation {
            return Err(InitError::Cancelled);
        }

        let endpoint = self.backend.socket_endpoint();
        self.channel.connect(&endpoint, &credentials.token).await?;

        if let Some(key) = config.supplied_conversation_key() {
            return Ok(key.clone());
        }
        self.backend
            .create_conversation(&ConversationRequest::from(config))
            .await
            .map_err(|e| InitError::KeyUnavailable(e.to_string()))
    }

    /// Watch the channel: forward state changes and fail the session on a
    /// fatal channel error.
    fn spawn_supervisor(&self) {
        let mut rx = self.channel.state_receiver();
        let channel = Arc::clone(&self.channel);
        let state = Arc::clone(&self.state);
        let bus = self.event_bus.clone();

        let handle = tokio::spawn(async move {
            let mut last = None;
            loop {
                let conn_state = *rx.borrow_and_update();
                if last == Some(conn_state) {
                    if rx.changed().await.is_err() {
                        return;
                    }
                    continue;
                }
                last = Some(conn_state);
                bus.emit(SdkEvent::ConnectionStateChanged { state: conn_state });
                match conn_state {
                    ConnectionState::Failed => {
                        let error = channel.last_error().unwrap_or(ConnError::NotConnected);
                        let live = state
                            .read()
                            .unwrap_or_else(|e| e.into_inner())
                            .is_initialized();
                        if live {
                            warn!("session failed: {error}");
                            set_shared_state(
                                &state,
                                &bus,
                                SessionState::InitializationFailed(error.to_string()),
                            );
                            bus.emit(SdkEvent::SessionFailed { error });
                        }
                        return;
                    }
                    ConnectionState::Closed => return,
                    _ => {}
                }
            }
        });

        let previous = self
            .supervisor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// End the session: cancel an in-flight initialize, close the channel
    /// and forget the key. The session can be initialized again afterwards.
    pub async fn teardown(&self) {
        self.cancel_tx.send_modify(|g| *g = g.wrapping_add(1));

        let supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = supervisor {
            handle.abort();
        }

        // Wait for a cancelled initialize to unwind before releasing what it opened.
        let _lifecycle = self.lifecycle.lock().await;
        self.channel.close().await;
        self.channel.clear_dedup_history();
        self.clear_conversation_key();
        self.config.write().unwrap_or_else(|e| e.into_inner()).take();
        self.validator.reset();
        self.set_state(SessionState::NotInitialized);
        info!("session torn down");
    }
}

fn set_shared_state(state: &RwLock<SessionState>, bus: &EventBus, new_state: SessionState) {
    {
        let mut current = state.write().unwrap_or_else(|e| e.into_inner());
        if *current == new_state {
            return;
        }
        info!("session state: {} -> {}", *current, new_state);
        *current = new_state.clone();
    }
    bus.emit(SdkEvent::SessionStateChanged { state: new_state });
}

/// Translate inbound channel events into SDK events.
fn forward_inbound(bus: &EventBus, key: &RwLock<Option<ConversationKey>>, event: &InboundEvent) {
    match event.event_type {
        ChannelEventType::NewMessage => {
            if let Some(msg) = event.as_message() {
                bus.emit(SdkEvent::MessageReceived {
                    message_id: msg.id,
                    conversation_key: msg.conversation_key,
                    text: msg.text,
                    sender: msg.sender,
                });
            }
        }
        ChannelEventType::MessageStatus => {
            if let Some(status) = event.as_message_status() {
                bus.emit(SdkEvent::MessageStatusChanged {
                    message_id: status.id,
                    status: status.status,
                });
            }
        }
        ChannelEventType::Typing => {
            if let Some(typing) = event.as_typing() {
                bus.emit(SdkEvent::TypingChanged {
                    conversation_key: typing.conversation_key,
                    typing: typing.typing,
                });
            }
        }
        ChannelEventType::ConversationClosed => {
            let closed = event.data.get("conversationKey").and_then(|v| v.as_str());
            let mut current = key.write().unwrap_or_else(|e| e.into_inner());
            if current.as_ref().map(|k| k.as_str()) == closed {
                info!("conversation {:?} closed by backend", closed);
                current.take();
            }
        }
        _ => {}
    }
}
