//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Semaphore};

use wc_api::{ConversationRequest, ValidationOutcome, ValidationRequest, WidgetBackend};
use wc_core::config::RealtimeConfig;
use wc_core::error::{WcError, WcResult};
use wc_models::{ConversationKey, WidgetConfig};
use wc_services::{ChatWidget, SdkEvent};
use wc_socket::MemoryTransport;

pub const TOKEN: &str = "socket-token";

/// Backend double with call counters and a scripted validation reply.
pub struct MockBackend {
    outcome: Mutex<WcResult<ValidationOutcome>>,
    delay: Mutex<Option<Duration>>,
    conversation_error: Mutex<Option<String>>,
    validation_gate: Mutex<Option<Arc<Semaphore>>>,
    pub validate_calls: AtomicUsize,
    pub conversation_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Ok(ValidationOutcome::Valid {
                token: TOKEN.into(),
            })),
            delay: Mutex::new(None),
            conversation_error: Mutex::new(None),
            validation_gate: Mutex::new(None),
            validate_calls: AtomicUsize::new(0),
            conversation_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_outcome(&self, outcome: WcResult<ValidationOutcome>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Delay every backend call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_conversations(&self, message: &str) {
        *self.conversation_error.lock().unwrap() = Some(message.into());
    }

    /// Hold every validation reply until a permit is added to the
    /// returned semaphore.
    pub fn gate_validation(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.validation_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn validations(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn conversations(&self) -> usize {
        self.conversation_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn clone_outcome(outcome: &WcResult<ValidationOutcome>) -> WcResult<ValidationOutcome> {
    match outcome {
        Ok(o) => Ok(o.clone()),
        Err(WcError::AuthFailed(m)) => Err(WcError::AuthFailed(m.clone())),
        Err(WcError::Timeout(m)) => Err(WcError::Timeout(m.clone())),
        Err(e) => Err(WcError::Http(e.to_string())),
    }
}

#[async_trait]
impl WidgetBackend for MockBackend {
    async fn validate_credentials(&self, _request: &ValidationRequest) -> WcResult<ValidationOutcome> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let gate = self.validation_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        clone_outcome(&self.outcome.lock().unwrap())
    }

    async fn create_conversation(&self, _request: &ConversationRequest) -> WcResult<ConversationKey> {
        let n = self.conversation_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        if let Some(message) = self.conversation_error.lock().unwrap().clone() {
            return Err(WcError::Http(message));
        }
        Ok(ConversationKey::new(format!("conv-{n}")))
    }

    fn socket_endpoint(&self) -> String {
        "mem://chat".into()
    }
}

/// A well-formed widget config.
pub fn valid_config() -> WidgetConfig {
    WidgetConfig::new("b1", "v".repeat(32), "k1", 42)
}

/// Realtime settings with short backoff and no heartbeat interference.
pub fn fast_realtime() -> RealtimeConfig {
    RealtimeConfig {
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 40,
        max_reconnect_attempts: 3,
        jitter_factor: 0.0,
        connect_timeout_ms: 1_000,
        ping_interval_ms: 60_000,
        max_missed_pings: 3,
        event_capacity: 64,
    }
}

/// A widget wired to a mock backend and an in-memory transport.
pub fn create_test_widget() -> (ChatWidget, Arc<MockBackend>, MemoryTransport) {
    let backend = MockBackend::new();
    let transport = MemoryTransport::new();
    let widget = ChatWidget::with_parts(
        backend.clone(),
        Arc::new(transport.clone()),
        &fast_realtime(),
    );
    (widget, backend, transport)
}

/// Wait until `pred` matches an event, or panic after two seconds.
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<SdkEvent>, mut pred: F) -> SdkEvent
where
    F: FnMut(&SdkEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll `pred` until it holds, or panic after two seconds.
pub async fn wait_until<F: FnMut() -> bool>(mut pred: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
