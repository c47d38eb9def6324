//! WebSocket transport over tokio-tungstenite.
//!
//! Frames travel as JSON text messages. The auth token is passed in the
//! `token` query parameter of the upgrade request.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use wc_core::error::ConnError;

use super::{Connection, FrameSink, FrameStream, Transport};
use crate::events::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Append the token query parameter to the endpoint.
fn authenticated_url(endpoint: &str, token: &str) -> Result<String, ConnError> {
    let mut url = reqwest::Url::parse(endpoint)
        .map_err(|e| ConnError::Unreachable(format!("invalid socket endpoint {endpoint:?}: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str, token: &str) -> Result<Connection, ConnError> {
        let url = authenticated_url(endpoint, token)?;
        debug!("opening websocket to {endpoint}");

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                let (write, read) = ws.split();
                Ok(Connection::new(WsSink { inner: write }, WsReader { inner: read }))
            }
            Err(WsError::Http(response)) => {
                let status = response.status().as_u16();
                if status == 401 || status == 403 {
                    Err(ConnError::AuthFailed(format!("socket upgrade rejected ({status})")))
                } else {
                    Err(ConnError::Unreachable(format!("socket upgrade failed ({status})")))
                }
            }
            Err(e) => Err(ConnError::Unreachable(e.to_string())),
        }
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), ConnError> {
        let text = serde_json::to_string(&frame)
            .map_err(|e| ConnError::Unreachable(format!("frame encode failed: {e}")))?;
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| ConnError::Unreachable(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close().await {
            debug!("websocket close: {e}");
        }
    }
}

struct WsReader {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsReader {
    async fn recv(&mut self) -> Option<Result<Frame, ConnError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
                    Ok(frame) => return Some(Ok(frame)),
                    Err(e) => warn!("dropping malformed frame: {e}"),
                },
                Ok(Message::Close(frame)) => {
                    debug!("websocket closed by server: {frame:?}");
                    return None;
                }
                // Protocol pings are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(ConnError::Unreachable(e.to_string()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_appended_as_query() {
        let url = authenticated_url("wss://chat.example.com/socket", "abc 123").unwrap();
        assert_eq!(url, "wss://chat.example.com/socket?token=abc+123");

        let url = authenticated_url("ws://localhost:8080/socket?v=2", "t").unwrap();
        assert_eq!(url, "ws://localhost:8080/socket?v=2&token=t");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            authenticated_url("not a url", "t"),
            Err(ConnError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Port 9 (discard) on localhost is not expected to accept websockets.
        let result = WebSocketTransport::new()
            .connect("ws://127.0.0.1:9/socket", "t")
            .await;
        assert!(matches!(result, Err(ConnError::Unreachable(_))));
    }
}
