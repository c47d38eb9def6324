//! Transport seam for the realtime channel.
//!
//! A transport opens one authenticated connection per call and hands it
//! back as independent write and read halves. The channel owns both halves
//! for the lifetime of a connection epoch and closes the sink exactly once.

pub mod memory;
pub mod websocket;

use async_trait::async_trait;

use wc_core::error::ConnError;

use crate::events::Frame;

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), ConnError>;

    /// Release the underlying connection.
    async fn close(&mut self);
}

/// Read half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next inbound frame. `None` means the peer closed the connection.
    ///
    /// Must be cancel-safe: the channel polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<Frame, ConnError>>;
}

/// An open connection, split into halves.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

impl Connection {
    pub fn new(sink: impl FrameSink + 'static, stream: impl FrameStream + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }
}

/// Opens authenticated connections to a socket endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate with `token`.
    ///
    /// Returns `ConnError::AuthFailed` when the backend rejects the token.
    async fn connect(&self, endpoint: &str, token: &str) -> Result<Connection, ConnError>;
}
