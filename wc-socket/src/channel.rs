//! Realtime channel.
//!
//! Owns the connection to the backend socket, handling automatic
//! reconnection with exponential backoff and jitter, heartbeat monitoring,
//! ordered outbound delivery, and inbound event routing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use wc_core::config::RealtimeConfig;
use wc_core::constants;
use wc_core::error::ConnError;

use crate::events::{
    ChannelEventType, ConnectionState, EventDispatcher, Frame, InboundEvent, ListenerId,
};
use crate::transport::{Connection, Transport};

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Base delay between reconnection attempts.
    pub base_delay: Duration,
    /// Maximum delay cap for exponential backoff.
    pub max_delay: Duration,
    /// Maximum number of reconnection attempts (0 = unlimited).
    pub max_attempts: u32,
    /// Jitter factor (0.0 to 1.0) added to each delay.
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
            jitter_factor: 0.3,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (0-based).
    ///
    /// Sequence: 1s, 2s, 4s, 8s, 16s, capped at max_delay, each with
    /// +/- jitter_factor applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64();

        let exponential = (base * 2.0_f64.powi(attempt.min(30) as i32)).min(max);

        let jitter_range = exponential * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;

        Duration::from_secs_f64((exponential + jitter).max(0.0))
    }
}

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Interval between heartbeat pings.
    pub interval: Duration,
    /// Number of unanswered pings before the connection is considered dead.
    pub max_missed_pings: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(25),
            max_missed_pings: 3,
        }
    }
}

/// Full channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub reconnect: ReconnectConfig,
    pub health: HealthCheckConfig,
    /// Timeout for a single connect attempt.
    pub connect_timeout: Duration,
    /// Capacity of the inbound broadcast channel.
    pub event_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            health: HealthCheckConfig::default(),
            connect_timeout: Duration::from_secs(15),
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&RealtimeConfig> for ChannelConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            reconnect: ReconnectConfig {
                base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
                max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
                max_attempts: config.max_reconnect_attempts,
                jitter_factor: config.jitter_factor,
            },
            health: HealthCheckConfig {
                interval: Duration::from_millis(config.ping_interval_ms.max(1)),
                max_missed_pings: config.max_missed_pings.max(1),
            },
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            event_capacity: config.event_capacity.max(1),
        }
    }
}

/// State shared between the channel handle and its background task.
struct Shared {
    transport: Arc<dyn Transport>,
    config: ChannelConfig,
    dispatcher: EventDispatcher,
    state_tx: watch::Sender<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<Frame>,
    /// Held by the running task for its whole lifetime.
    outbound_rx: Mutex<mpsc::UnboundedReceiver<Frame>>,
    endpoint: RwLock<String>,
    token: RwLock<String>,
    last_error: StdMutex<Option<ConnError>>,
    epoch: AtomicU64,
    /// Bumped by `close` to cancel an in-flight connect.
    cancel_tx: watch::Sender<u64>,
    handled_ids: StdMutex<VecDeque<String>>,
}

struct Worker {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

enum PumpEnd {
    Shutdown,
    Lost(ConnError),
}

enum ReconnectEnd {
    Connected(Connection),
    Shutdown,
    Failed(ConnError),
}

/// Persistent bidirectional channel to the chat backend.
///
/// - `connect` makes a single authenticated attempt and, on success, hands
///   the connection to a background task
/// - lost connections are re-established silently with backoff, each
///   attempt re-authenticating with the latest token
/// - frames passed to `send` are queued and written in order, including
///   frames queued while reconnecting
/// - an auth rejection during reconnect, or running out of attempts, moves
///   the channel to `Failed` with the cause in `last_error`
/// - `close` is idempotent, cancels an in-flight `connect`, and releases
///   the active connection exactly once
pub struct RealtimeChannel {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    /// Serializes `connect` calls; `close` never takes it.
    connect_gate: Mutex<()>,
}

impl RealtimeChannel {
    pub fn new(transport: Arc<dyn Transport>, config: ChannelConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (cancel_tx, _) = watch::channel(0u64);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let dispatcher = EventDispatcher::new(config.event_capacity);

        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                dispatcher,
                state_tx,
                outbound_tx,
                outbound_rx: Mutex::new(outbound_rx),
                endpoint: RwLock::new(String::new()),
                token: RwLock::new(String::new()),
                last_error: StdMutex::new(None),
                epoch: AtomicU64::new(0),
                cancel_tx,
                handled_ids: StdMutex::new(VecDeque::new()),
            }),
            worker: Mutex::new(None),
            connect_gate: Mutex::new(()),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of connections established since creation.
    pub fn epoch(&self) -> u64 {
        self.shared.epoch.load(Ordering::SeqCst)
    }

    /// Most recent connection error.
    pub fn last_error(&self) -> Option<ConnError> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Subscribe to inbound events.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.shared.dispatcher.subscribe()
    }

    /// Register a listener called for each inbound event, in arrival order.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.dispatcher.remove_listener(id)
    }

    /// Replace the token used by subsequent reconnect attempts.
    pub fn update_token(&self, token: impl Into<String>) {
        *self.shared.token.write().unwrap_or_else(|e| e.into_inner()) = token.into();
    }

    /// Connect to `endpoint`, authenticating with `auth_token`.
    ///
    /// Makes one attempt; reconnection only applies to connections that were
    /// established and later lost. Returns immediately if already running.
    pub async fn connect(&self, endpoint: &str, auth_token: &str) -> Result<(), ConnError> {
        let _gate = self.connect_gate.lock().await;
        let mut cancel_rx = self.shared.cancel_tx.subscribe();
        let generation = *cancel_rx.borrow();

        {
            let mut worker = self.worker.lock().await;
            if let Some(running) = worker.take() {
                if !running.handle.is_finished() && self.state() != ConnectionState::Failed {
                    debug!("channel already running, skipping connect");
                    *worker = Some(running);
                    return Ok(());
                }
                // A failed task is on its way out; start afresh once it is gone.
                if let Err(e) = running.handle.await {
                    error!("channel task ended abnormally: {e}");
                }
            }
        }

        {
            *self.shared.endpoint.write().unwrap_or_else(|e| e.into_inner()) =
                endpoint.to_string();
            *self.shared.token.write().unwrap_or_else(|e| e.into_inner()) =
                auth_token.to_string();
        }
        self.shared.set_state(ConnectionState::Connecting);
        info!("channel connecting to {endpoint}");

        let attempt = tokio::select! {
            result = self.shared.open(endpoint, auth_token) => result,
            _ = cancel_rx.changed() => {
                info!("channel connect cancelled by close");
                return Err(ConnError::Closed);
            }
        };

        let mut conn = match attempt {
            Ok(conn) => conn,
            Err(e) => {
                warn!("channel connect failed: {e}");
                self.shared.record_error(e.clone());
                if *self.shared.cancel_tx.borrow() == generation {
                    self.shared.set_state(ConnectionState::Disconnected);
                }
                return Err(e);
            }
        };

        let mut worker = self.worker.lock().await;
        if *self.shared.cancel_tx.borrow() != generation {
            // close() ran while the handshake finished.
            conn.sink.close().await;
            return Err(ConnError::Closed);
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.clear_error();
        self.shared.set_state(ConnectionState::Connected);
        info!("channel connected (epoch {epoch})");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run(shared, conn, shutdown_rx));
        *worker = Some(Worker {
            handle,
            shutdown: shutdown_tx,
        });
        Ok(())
    }

    /// Queue a frame for delivery.
    ///
    /// Fire-and-forget: frames queued while reconnecting are written, in
    /// order, once the next connection is up.
    pub fn send(&self, event: &str, payload: serde_json::Value) -> Result<(), ConnError> {
        let state = self.state();
        if !state.accepts_sends() {
            return Err(match state {
                ConnectionState::Closed => ConnError::Closed,
                ConnectionState::Failed => self.last_error().unwrap_or(ConnError::NotConnected),
                _ => ConnError::NotConnected,
            });
        }
        self.shared
            .outbound_tx
            .send(Frame::new(event, payload))
            .map_err(|_| ConnError::Closed)
    }

    /// Close the channel and release the connection.
    ///
    /// Safe to call repeatedly and concurrently with `connect`. The channel
    /// can be connected again afterwards.
    pub async fn close(&self) {
        self.shared.cancel_tx.send_modify(|g| *g = g.wrapping_add(1));

        let mut worker = self.worker.lock().await;
        if let Some(running) = worker.take() {
            let _ = running.shutdown.send(());
            if let Err(e) = running.handle.await {
                error!("channel task ended abnormally: {e}");
            }
        }

        // Frames queued for a connection that will never come.
        let mut outbound = self.shared.outbound_rx.lock().await;
        let mut dropped = 0usize;
        while outbound.try_recv().is_ok() {
            dropped += 1;
        }
        drop(outbound);
        if dropped > 0 {
            debug!("discarded {dropped} queued frame(s) on close");
        }

        self.shared.set_state(ConnectionState::Closed);
        drop(worker);
    }

    /// Clear the inbound deduplication history.
    pub fn clear_dedup_history(&self) {
        self.shared
            .handled_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Shared {
    /// Update the connection state and notify watchers.
    fn set_state(&self, new_state: ConnectionState) {
        self.state_tx.send_if_modified(|state| {
            if *state != new_state {
                info!("channel state: {} -> {}", *state, new_state);
                *state = new_state;
                true
            } else {
                false
            }
        });
    }

    fn record_error(&self, err: ConnError) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn fail(&self, err: ConnError) {
        error!("channel failed: {err}");
        self.record_error(err);
        self.set_state(ConnectionState::Failed);
    }

    fn credentials(&self) -> (String, String) {
        (
            self.endpoint.read().unwrap_or_else(|e| e.into_inner()).clone(),
            self.token.read().unwrap_or_else(|e| e.into_inner()).clone(),
        )
    }

    /// One connect attempt bounded by the connect timeout.
    async fn open(&self, endpoint: &str, token: &str) -> Result<Connection, ConnError> {
        let limit = self.config.connect_timeout;
        match timeout(limit, self.transport.connect(endpoint, token)).await {
            Ok(result) => result,
            Err(_) => Err(ConnError::Timeout(limit.as_millis() as u64)),
        }
    }

    /// Deduplicate and dispatch an inbound frame.
    fn handle_inbound(&self, frame: Frame) {
        let event_type = ChannelEventType::from_str(&frame.event);

        if event_type.is_message_event() {
            if let Some(id) = frame.message_id() {
                let key = format!("{}:{id}", frame.event);
                let mut ids = self.handled_ids.lock().unwrap_or_else(|e| e.into_inner());
                if ids.contains(&key) {
                    debug!("duplicate event skipped: {key}");
                    return;
                }
                ids.push_back(key);
                if ids.len() > constants::MAX_HANDLED_ID_HISTORY {
                    ids.pop_front();
                }
            }
        }

        debug!("channel event: {}", frame.event);
        self.dispatcher.dispatch(InboundEvent {
            event_type,
            data: frame.data,
            epoch: self.epoch.load(Ordering::SeqCst),
            received_at: Utc::now(),
        });
    }
}

/// Background task: pump the live connection, reconnect when it drops.
async fn run(shared: Arc<Shared>, mut conn: Connection, mut shutdown: oneshot::Receiver<()>) {
    let mut outbound = shared.outbound_rx.lock().await;

    loop {
        let end = pump(&shared, &mut conn, &mut outbound, &mut shutdown).await;
        conn.sink.close().await;

        let reason = match end {
            PumpEnd::Shutdown => return,
            PumpEnd::Lost(reason) => reason,
        };
        warn!("channel connection lost: {reason}");
        shared.record_error(reason);

        match reconnect(&shared, &mut shutdown).await {
            ReconnectEnd::Connected(next) => conn = next,
            ReconnectEnd::Shutdown => return,
            ReconnectEnd::Failed(err) => {
                shared.fail(err);
                // Sends are refused from here; nothing queued so far belongs
                // to any later connection.
                let mut dropped = 0usize;
                while outbound.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    warn!("discarded {dropped} queued frame(s) after reconnection failed");
                }
                return;
            }
        }
    }
}

async fn pump(
    shared: &Shared,
    conn: &mut Connection,
    outbound: &mut mpsc::UnboundedReceiver<Frame>,
    shutdown: &mut oneshot::Receiver<()>,
) -> PumpEnd {
    let interval = shared.config.health.interval;
    let max_missed = shared.config.health.max_missed_pings;
    let mut heartbeat = tokio::time::interval_at(Instant::now() + interval, interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut missed = 0u32;

    loop {
        tokio::select! {
            _ = &mut *shutdown => return PumpEnd::Shutdown,

            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = conn.sink.send(frame).await {
                        return PumpEnd::Lost(e);
                    }
                }
                None => return PumpEnd::Shutdown,
            },

            inbound = conn.stream.recv() => match inbound {
                Some(Ok(frame)) if frame.is_pong() => missed = 0,
                Some(Ok(frame)) => shared.handle_inbound(frame),
                Some(Err(e)) => return PumpEnd::Lost(e),
                None => {
                    return PumpEnd::Lost(ConnError::Unreachable("connection closed by peer".into()))
                }
            },

            _ = heartbeat.tick() => {
                if missed >= max_missed {
                    return PumpEnd::Lost(ConnError::Unreachable(format!(
                        "{missed} heartbeat(s) unanswered"
                    )));
                }
                missed += 1;
                if missed > 1 {
                    warn!("missed ping #{}/{max_missed}", missed - 1);
                }
                if let Err(e) = conn.sink.send(Frame::ping()).await {
                    return PumpEnd::Lost(e);
                }
            }
        }
    }
}

/// Reconnect with exponential backoff until connected, shut down, or failed.
async fn reconnect(shared: &Shared, shutdown: &mut oneshot::Receiver<()>) -> ReconnectEnd {
    shared.set_state(ConnectionState::Reconnecting);
    let max_attempts = shared.config.reconnect.max_attempts;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if max_attempts > 0 && attempt > max_attempts {
            return ReconnectEnd::Failed(ConnError::RetriesExhausted {
                attempts: max_attempts,
            });
        }

        let delay = shared.config.reconnect.delay_for(attempt - 1);
        warn!(
            "reconnection attempt {} in {:.1}s",
            attempt,
            delay.as_secs_f64()
        );

        // Wait for delay, but abort if a shutdown is requested
        tokio::select! {
            _ = sleep(delay) => {},
            _ = &mut *shutdown => {
                info!("reconnection cancelled by close");
                return ReconnectEnd::Shutdown;
            }
        }

        let (endpoint, token) = shared.credentials();
        let result = tokio::select! {
            result = shared.open(&endpoint, &token) => result,
            _ = &mut *shutdown => return ReconnectEnd::Shutdown,
        };

        match result {
            Ok(conn) => {
                let epoch = shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                shared.clear_error();
                shared.set_state(ConnectionState::Connected);
                info!("reconnected after {attempt} attempt(s) (epoch {epoch})");
                return ReconnectEnd::Connected(conn);
            }
            Err(e) if e.is_fatal() => return ReconnectEnd::Failed(e),
            Err(e) => {
                error!("reconnection attempt {attempt} failed: {e}");
                shared.record_error(e);
            }
        }
    }
}
