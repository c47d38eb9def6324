//! WidgetChat Socket - the realtime channel for live conversation traffic.
//!
//! This crate provides the `RealtimeChannel` that handles:
//! - Token-authenticated connection to the backend socket endpoint
//! - Automatic reconnection with exponential backoff, jitter and an attempt cap
//! - Ordered, queued outbound sends that survive a reconnect
//! - Heartbeat pings and dead-connection detection
//! - Inbound deduplication and dispatch to listeners and broadcast subscribers
//! - Pluggable transports: WebSocket for production, in-memory for tests

pub mod channel;
pub mod events;
pub mod transport;

// Re-export key types
pub use channel::{ChannelConfig, HealthCheckConfig, RealtimeChannel, ReconnectConfig};
pub use events::{
    ChannelEventType, ConnectionState, EventDispatcher, Frame, InboundEvent, ListenerId,
    MessagePayload, MessageStatusPayload, TypingPayload,
};
pub use transport::memory::{ConnectOutcome, MemoryTransport, ServerHandle};
pub use transport::websocket::WebSocketTransport;
pub use transport::{Connection, FrameSink, FrameStream, Transport};
