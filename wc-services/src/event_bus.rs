//! Typed event bus for SDK notifications.
//!
//! Uses a tokio broadcast channel so the host UI (and tests) can observe
//! session, connection and conversation changes without polling.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use wc_core::error::ConnError;
use wc_models::{ConversationKey, ResolvedTheme, ScreenDescriptor, SessionState, ValidationState};
use wc_socket::ConnectionState;

/// Events emitted by the SDK.
///
/// These are distinct from raw channel events: they are the processed,
/// caller-meaningful changes.
#[derive(Debug, Clone)]
pub enum SdkEvent {
    /// The session moved to a new lifecycle state.
    SessionStateChanged { state: SessionState },
    /// The credential check moved to a new state.
    ValidationStateChanged { state: ValidationState },
    /// The realtime channel moved to a new state.
    ConnectionStateChanged { state: ConnectionState },
    /// A conversation key was issued or supplied.
    ConversationKeyAssigned { key: ConversationKey },
    /// A message arrived on the realtime channel.
    MessageReceived {
        message_id: String,
        conversation_key: String,
        text: String,
        sender: String,
    },
    /// The delivery or read status of a sent message changed.
    MessageStatusChanged { message_id: String, status: String },
    /// The bot or agent started or stopped typing.
    TypingChanged {
        conversation_key: String,
        typing: bool,
    },
    /// A theme was applied.
    ThemeApplied { theme: ResolvedTheme },
    /// A screen was presented.
    ScreenPresented { descriptor: Box<ScreenDescriptor> },
    /// The live session failed and must be re-initialized.
    SessionFailed { error: ConnError },
}

/// SDK-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Slow subscribers that fall behind
/// receive a `Lagged` error and may miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<SdkEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: SdkEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &SdkEvent) -> &'static str {
    match event {
        SdkEvent::SessionStateChanged { .. } => "SessionStateChanged",
        SdkEvent::ValidationStateChanged { .. } => "ValidationStateChanged",
        SdkEvent::ConnectionStateChanged { .. } => "ConnectionStateChanged",
        SdkEvent::ConversationKeyAssigned { .. } => "ConversationKeyAssigned",
        SdkEvent::MessageReceived { .. } => "MessageReceived",
        SdkEvent::MessageStatusChanged { .. } => "MessageStatusChanged",
        SdkEvent::TypingChanged { .. } => "TypingChanged",
        SdkEvent::ThemeApplied { .. } => "ThemeApplied",
        SdkEvent::ScreenPresented { .. } => "ScreenPresented",
        SdkEvent::SessionFailed { .. } => "SessionFailed",
    }
}
