//! Realtime event types, wire frames and the event dispatcher.
//!
//! Defines the events exchanged with the chat backend over the realtime
//! socket and a dispatcher that delivers inbound events to ordered
//! listeners and broadcast subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use wc_core::constants::events;

/// Event types carried on the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelEventType {
    /// A new message in the conversation (`new-message`).
    NewMessage,
    /// Delivery/read status of a message changed (`message-status`).
    MessageStatus,
    /// The bot or an agent started or stopped typing (`typing`).
    Typing,
    /// The backend closed the conversation (`conversation-closed`).
    ConversationClosed,
    /// A human agent took over the conversation (`agent-assigned`).
    AgentAssigned,
    /// Heartbeat reply (`pong`).
    Pong,
    /// Unknown event, passed through untouched.
    Unknown(String),
}

impl ChannelEventType {
    /// Parse an event name from the backend.
    pub fn from_str(s: &str) -> Self {
        match s {
            events::NEW_MESSAGE => Self::NewMessage,
            events::MESSAGE_STATUS => Self::MessageStatus,
            events::TYPING => Self::Typing,
            events::CONVERSATION_CLOSED => Self::ConversationClosed,
            events::AGENT_ASSIGNED => Self::AgentAssigned,
            events::PONG => Self::Pong,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert to the wire event name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewMessage => events::NEW_MESSAGE,
            Self::MessageStatus => events::MESSAGE_STATUS,
            Self::Typing => events::TYPING,
            Self::ConversationClosed => events::CONVERSATION_CLOSED,
            Self::AgentAssigned => events::AGENT_ASSIGNED,
            Self::Pong => events::PONG,
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Whether this event type carries a message id subject to deduplication.
    pub fn is_message_event(&self) -> bool {
        matches!(self, Self::NewMessage | Self::MessageStatus)
    }
}

/// One JSON message on the wire: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Heartbeat ping.
    pub fn ping() -> Self {
        Self::new(events::PING, serde_json::json!({ "ts": Utc::now().timestamp_millis() }))
    }

    pub fn is_pong(&self) -> bool {
        self.event == events::PONG
    }

    /// The `id` field of the payload, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.data.get("id").and_then(|v| v.as_str())
    }
}

/// Payload of a `new-message` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub conversation_key: String,
    #[serde(default)]
    pub text: String,
    /// "bot", "agent" or "visitor".
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Payload of a `message-status` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusPayload {
    pub id: String,
    pub status: String,
}

/// Payload of a `typing` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub conversation_key: String,
    pub typing: bool,
}

/// An inbound event as delivered to listeners.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub event_type: ChannelEventType,
    pub data: serde_json::Value,
    /// Connection epoch the event arrived on.
    pub epoch: u64,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn as_message(&self) -> Option<MessagePayload> {
        if self.event_type == ChannelEventType::NewMessage {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    pub fn as_message_status(&self) -> Option<MessageStatusPayload> {
        if self.event_type == ChannelEventType::MessageStatus {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }

    pub fn as_typing(&self) -> Option<TypingPayload> {
        if self.event_type == ChannelEventType::Typing {
            serde_json::from_value(self.data.clone()).ok()
        } else {
            None
        }
    }
}

/// Handle returned by `EventDispatcher::add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

/// Delivers inbound events to registered listeners, in registration order,
/// and to broadcast subscribers.
///
/// Listeners run on the channel task and must not block. Registration is
/// safe at any time, including while the channel is opening or closing.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<InboundEvent>,
    listeners: Arc<RwLock<Vec<(ListenerId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl EventDispatcher {
    /// Create a new EventDispatcher with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to receive inbound events.
    ///
    /// Slow consumers that fall behind receive `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.sender.subscribe()
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the listener was already removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Dispatch an event to all listeners, then to broadcast subscribers.
    pub fn dispatch(&self, event: InboundEvent) {
        // Snapshot so listeners can (de)register from inside a callback.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in &listeners {
            listener(&event);
        }

        let event_type = event.event_type.as_str().to_string();
        match self.sender.send(event) {
            Ok(count) => debug!("dispatched {event_type} to {count} subscriber(s)"),
            Err(_) => debug!("no subscribers for event {event_type}"),
        }
    }

    /// Get the current number of broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Connection state of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected, or the initial connect failed.
    Disconnected,
    /// Initial connect in progress.
    Connecting,
    /// Connected and exchanging frames.
    Connected,
    /// Connection lost, reconnecting in the background.
    Reconnecting,
    /// Closed by the owner.
    Closed,
    /// Gave up: auth rejected or reconnect attempts exhausted.
    Failed,
}

impl ConnectionState {
    /// Whether frames handed to `send` will eventually be written.
    pub fn accepts_sends(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
