//! In-process transport with a scriptable server side.
//!
//! Each accepted connection produces a `ServerHandle` the test (or a demo)
//! uses to push frames, read what the client wrote, and drop the connection.
//! Connect outcomes can be queued ahead of time, and counters record how
//! many connections were opened and how many sink closes happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use wc_core::error::ConnError;

use super::{Connection, FrameSink, FrameStream, Transport};
use crate::events::Frame;

/// What the next connect attempt does.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Accept,
    Refuse(ConnError),
}

struct Inner {
    script: Mutex<VecDeque<ConnectOutcome>>,
    required_token: Mutex<Option<String>>,
    tokens_seen: Mutex<Vec<String>>,
    gate: watch::Sender<bool>,
    accepted_tx: mpsc::UnboundedSender<ServerHandle>,
    accepted_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServerHandle>>,
    attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Scriptable in-memory transport. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                required_token: Mutex::new(None),
                tokens_seen: Mutex::new(Vec::new()),
                gate,
                accepted_tx,
                accepted_rx: tokio::sync::Mutex::new(accepted_rx),
                attempts: AtomicUsize::new(0),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue the outcome of a future connect attempt. Unscripted attempts accept.
    pub fn push_outcome(&self, outcome: ConnectOutcome) {
        self.inner
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Refuse the next `n` attempts with `err`.
    pub fn refuse_next(&self, n: usize, err: ConnError) {
        for _ in 0..n {
            self.push_outcome(ConnectOutcome::Refuse(err.clone()));
        }
    }

    /// Reject connects whose token differs from `token` with `AuthFailed`.
    pub fn require_token(&self, token: Option<&str>) {
        *self
            .inner
            .required_token
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = token.map(str::to_string);
    }

    /// Hold connect attempts until `resume`.
    pub fn pause(&self) {
        self.inner.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.inner.gate.send_replace(true);
    }

    /// Wait for the next accepted connection.
    pub async fn next_connection(&self) -> Option<ServerHandle> {
        self.inner.accepted_rx.lock().await.recv().await
    }

    /// Connect attempts made, including refused ones.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Connections accepted.
    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Sink `close` calls across all connections.
    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.inner
            .tokens_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, _endpoint: &str, token: &str) -> Result<Connection, ConnError> {
        let mut gate = self.inner.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(ConnError::Unreachable("transport dropped".into()));
        }

        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner
            .tokens_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(token.to_string());

        let outcome = self
            .inner
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);
        if let ConnectOutcome::Refuse(err) = outcome {
            return Err(err);
        }

        let required = self
            .inner
            .required_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(required) = required {
            if required != token {
                return Err(ConnError::AuthFailed("token rejected".into()));
            }
        }

        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        let handle = ServerHandle {
            to_client,
            from_client,
        };
        self.inner
            .accepted_tx
            .send(handle)
            .map_err(|_| ConnError::Unreachable("transport dropped".into()))?;

        Ok(Connection::new(
            MemorySink {
                tx: to_server,
                inner: Arc::clone(&self.inner),
            },
            MemoryStream { rx: from_server },
        ))
    }
}

/// Server side of one accepted in-memory connection.
///
/// Dropping the handle looks like the server going away.
pub struct ServerHandle {
    to_client: mpsc::UnboundedSender<Result<Frame, ConnError>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl ServerHandle {
    /// Push a frame to the client. Returns false if the client is gone.
    pub fn push(&self, frame: Frame) -> bool {
        self.to_client.send(Ok(frame)).is_ok()
    }

    pub fn push_event(&self, event: &str, data: serde_json::Value) -> bool {
        self.push(Frame::new(event, data))
    }

    /// Next frame written by the client; `None` once the client released it.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Simulate a network drop.
    pub fn drop_connection(self) {
        let _ = self
            .to_client
            .send(Err(ConnError::Unreachable("connection dropped by server".into())));
    }
}

struct MemorySink {
    tx: mpsc::UnboundedSender<Frame>,
    inner: Arc<Inner>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), ConnError> {
        self.tx
            .send(frame)
            .map_err(|_| ConnError::Unreachable("server side closed".into()))
    }

    async fn close(&mut self) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Result<Frame, ConnError>>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<Frame, ConnError>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_and_exchange() {
        let transport = MemoryTransport::new();
        let mut conn = transport.connect("mem://chat", "t1").await.unwrap();
        let mut server = transport.next_connection().await.unwrap();

        conn.sink.send(Frame::new("send-message", serde_json::json!({"text": "hi"}))).await.unwrap();
        assert_eq!(server.recv().await.unwrap().event, "send-message");

        assert!(server.push_event("typing", serde_json::json!({"typing": true})));
        let frame = conn.stream.recv().await.unwrap().unwrap();
        assert_eq!(frame.event, "typing");

        conn.sink.close().await;
        assert_eq!(transport.opened(), 1);
        assert_eq!(transport.closed(), 1);
        assert_eq!(transport.tokens_seen(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_scripted_refusal_then_accept() {
        let transport = MemoryTransport::new();
        transport.refuse_next(1, ConnError::Unreachable("down".into()));

        assert!(matches!(
            transport.connect("mem://chat", "t").await,
            Err(ConnError::Unreachable(_))
        ));
        assert!(transport.connect("mem://chat", "t").await.is_ok());
        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.opened(), 1);
    }

    #[tokio::test]
    async fn test_required_token() {
        let transport = MemoryTransport::new();
        transport.require_token(Some("good"));
        assert!(matches!(
            transport.connect("mem://chat", "bad").await,
            Err(ConnError::AuthFailed(_))
        ));
        assert!(transport.connect("mem://chat", "good").await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_connection_surfaces_error() {
        let transport = MemoryTransport::new();
        let mut conn = transport.connect("mem://chat", "t").await.unwrap();
        let server = transport.next_connection().await.unwrap();
        server.drop_connection();
        assert!(matches!(conn.stream.recv().await, Some(Err(_))));
        assert!(conn.stream.recv().await.is_none());
    }
}
