use super::event::{Envelope, EventKind};
use super::registry::{EventHandler, SubscriberRegistry};
use super::transport::{
    Connection, Connector, OutboundFrame, TransportEvent, TungsteniteConnector, NORMAL_CLOSURE,
};
use crate::config::RealtimeConfig;
use crate::session::store::{current_user_id, SessionStore};
use crate::types::Notification;
use log::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use url::Url;

const DISCONNECT_REASON: &str = "Client disconnecting";

/// Lifecycle of the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Open,
    #[default]
    Closed,
}

/// How a single connection session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Closed with the normal-closure code; do not reconnect.
    Normal,
    /// Lost or never established; eligible for reconnection.
    Abnormal(Option<u16>),
    /// The client was disconnected while this session was running.
    Superseded,
}

// Transport bookkeeping, only touched in short critical sections
#[derive(Default)]
struct Link {
    state: ConnectionState,
    attempt: u32,
    // Bumped by every explicit shutdown; stale manager tasks compare and exit
    generation: u64,
    outbound: Option<tokio::sync::mpsc::Sender<OutboundFrame>>,
    manager: Option<JoinHandle<()>>,
}

struct Shared {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    session: Arc<dyn SessionStore>,
    registry: Mutex<SubscriberRegistry>,
    link: Mutex<Link>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Realtime notification client.
///
/// Keeps a single WebSocket connection to
/// `<ws_base_url>/ws/notifications/<user-id>/` alive while a session exists,
/// dispatches inbound envelopes to one handler per [`EventKind`] and recovers
/// from abnormal closures with exponential backoff.
///
/// None of the public methods return errors: transport failures are logged
/// and handled by the reconnection policy. [`connect`](Self::connect) must be
/// called from within a Tokio runtime.
pub struct NotificationClient {
    shared: Arc<Shared>,
}

impl NotificationClient {
    /// Client using the `tokio-tungstenite` transport.
    pub fn new(config: RealtimeConfig, session: Arc<dyn SessionStore>) -> Self {
        Self::with_connector(config, session, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(
        config: RealtimeConfig,
        session: Arc<dyn SessionStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                session,
                registry: Mutex::new(SubscriberRegistry::new()),
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Registers `handler` for `kind`, replacing any previous handler.
    ///
    /// The handler runs inline on the connection task, so it should return
    /// quickly; a slow handler delays every later frame. A panic inside the
    /// handler is logged and only drops the frame being handled.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        if lock(&self.shared.registry).insert(kind, handler).is_some() {
            debug!("Replaced existing handler for '{}' events", kind);
        }
    }

    /// Registers a handler for `notification` events with the payload decoded
    /// into a [`Notification`]. Payloads that fail to decode are logged and
    /// dropped.
    pub fn subscribe_notifications<F>(&self, handler: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Notification, move |data| {
            match serde_json::from_value::<Notification>(data) {
                Ok(notification) => handler(notification),
                Err(e) => warn!("Discarding malformed notification payload: {}", e),
            }
        });
    }

    pub fn unsubscribe(&self, kind: EventKind) {
        lock(&self.shared.registry).remove(kind);
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared.link).state == ConnectionState::Open
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.link).state
    }

    /// Starts the connection if there is a persisted identity and no
    /// connection is already open or in progress. Otherwise does nothing.
    pub fn connect(&self) {
        Shared::connect(&self.shared);
    }

    /// Sends `message` as JSON if the connection is open. When it is not,
    /// the message is dropped with a warning. Delivery is best effort.
    pub async fn send<T: Serialize + ?Sized>(&self, message: &T) {
        let outbound = {
            let link = lock(&self.shared.link);
            match (&link.outbound, link.state) {
                (Some(tx), ConnectionState::Open) => tx.clone(),
                _ => {
                    warn!("WebSocket is not connected; dropping outbound message");
                    return;
                }
            }
        };
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize outbound message: {}", e);
                return;
            }
        };
        if outbound.send(OutboundFrame::Text(text)).await.is_err() {
            warn!("WebSocket writer is gone; outbound message dropped");
        }
    }

    /// Closes the connection with the normal-closure code, clears every
    /// subscription and cancels any pending reconnect. Safe to call when
    /// already disconnected.
    pub async fn disconnect(&self) {
        self.shutdown().await;
        lock(&self.shared.registry).clear();
        info!("Notification client disconnected");
    }

    /// Disconnects (clearing subscriptions, like [`disconnect`](Self::disconnect)),
    /// resets the retry counter and connects again. Handlers must be
    /// registered again afterwards.
    pub async fn reconnect(&self) {
        self.disconnect().await;
        lock(&self.shared.link).attempt = 0;
        self.connect();
    }

    async fn shutdown(&self) {
        let (outbound, manager) = {
            let mut link = lock(&self.shared.link);
            link.generation = link.generation.wrapping_add(1);
            link.state = ConnectionState::Closed;
            (link.outbound.take(), link.manager.take())
        };
        if let Some(handle) = manager {
            handle.abort();
        }
        if let Some(tx) = outbound {
            if tx.send(close_frame()).await.is_err() {
                trace!("Transport already gone while sending close frame");
            }
        }
    }
}

fn close_frame() -> OutboundFrame {
    OutboundFrame::Close {
        code: NORMAL_CLOSURE,
        reason: DISCONNECT_REASON.to_string(),
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        let mut link = lock(&self.shared.link);
        link.generation = link.generation.wrapping_add(1);
        link.state = ConnectionState::Closed;
        if let Some(handle) = link.manager.take() {
            handle.abort();
        }
        if let Some(tx) = link.outbound.take() {
            if tx.try_send(close_frame()).is_err() {
                trace!("Could not queue close frame on drop");
            }
        }
    }
}

impl Shared {
    fn connect(this: &Arc<Self>) {
        let mut link = lock(&this.link);
        if link.manager.as_ref().map_or(false, |h| !h.is_finished()) {
            trace!("Connection already open or in progress; ignoring connect()");
            return;
        }
        let Some(url) = this.resolve_target() else {
            return;
        };
        let generation = link.generation;
        link.state = ConnectionState::Connecting;
        link.manager = Some(tokio::spawn(Self::run(Arc::clone(this), generation, url)));
    }

    /// Builds the target URL from the persisted identity.
    fn resolve_target(&self) -> Option<Url> {
        let Some(user_id) = current_user_id(self.session.as_ref()) else {
            info!("No user ID available for WebSocket connection");
            return None;
        };
        match self.config.notification_url(user_id) {
            Ok(url) => Some(url),
            Err(e) => {
                error!("Invalid notification endpoint: {}", e);
                None
            }
        }
    }

    async fn run(this: Arc<Self>, generation: u64, mut url: Url) {
        loop {
            match this.run_session(generation, &url).await {
                SessionEnd::Normal => {
                    info!("WebSocket closed normally; not reconnecting");
                    break;
                }
                SessionEnd::Superseded => break,
                SessionEnd::Abnormal(code) => {
                    info!("WebSocket disconnected (code: {:?})", code);
                }
            }

            let Some(delay) = this.schedule_reconnect(generation) else {
                break;
            };
            sleep(delay).await;

            if !this.is_current(generation) {
                break;
            }
            match this.resolve_target() {
                Some(next) => url = next,
                None => {
                    this.set_state(generation, ConnectionState::Closed);
                    break;
                }
            }
        }
        trace!("[Manager] Task finished.");
    }

    async fn run_session(&self, generation: u64, url: &Url) -> SessionEnd {
        if !self.set_state(generation, ConnectionState::Connecting) {
            return SessionEnd::Superseded;
        }

        let Connection {
            outbound,
            mut inbound,
        } = match timeout(self.config.connect_timeout, self.connector.connect(url)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                error!("Error creating WebSocket connection: {}", e);
                self.set_state(generation, ConnectionState::Closed);
                return SessionEnd::Abnormal(None);
            }
            Err(_) => {
                error!(
                    "WebSocket connection timed out after {:?}",
                    self.config.connect_timeout
                );
                self.set_state(generation, ConnectionState::Closed);
                return SessionEnd::Abnormal(None);
            }
        };

        {
            let mut link = lock(&self.link);
            if link.generation != generation {
                if outbound.try_send(close_frame()).is_err() {
                    trace!("Superseded transport already gone before close frame");
                }
                return SessionEnd::Superseded;
            }
            link.attempt = 0;
            link.state = ConnectionState::Open;
            link.outbound = Some(outbound);
        }
        info!("WebSocket connected");

        let close_code = loop {
            match inbound.recv().await {
                Some(TransportEvent::Text(text)) => self.dispatch_frame(&text),
                Some(TransportEvent::Error(e)) => error!("WebSocket error: {}", e),
                Some(TransportEvent::Closed(code)) => break code,
                None => break None,
            }
        };

        {
            let mut link = lock(&self.link);
            if link.generation != generation {
                return SessionEnd::Superseded;
            }
            link.state = ConnectionState::Closed;
            link.outbound = None;
        }

        if close_code == Some(NORMAL_CLOSURE) {
            SessionEnd::Normal
        } else {
            SessionEnd::Abnormal(close_code)
        }
    }

    /// Bumps the attempt counter and returns the delay before the next
    /// attempt, or `None` when the budget is spent or the session is stale.
    fn schedule_reconnect(&self, generation: u64) -> Option<Duration> {
        let policy = self.config.reconnect;
        let mut link = lock(&self.link);
        if link.generation != generation {
            return None;
        }
        if !policy.allows(link.attempt) {
            let attempts = link.attempt;
            drop(link);
            error!("Max reconnection attempts reached ({})", policy.max_attempts);
            self.emit(EventKind::ConnectionLost, json!({ "attempts": attempts }));
            return None;
        }
        link.attempt += 1;
        let delay = policy.delay_for(link.attempt);
        warn!(
            "Attempting to reconnect in {}ms (attempt {}/{})",
            delay.as_millis(),
            link.attempt,
            policy.max_attempts
        );
        Some(delay)
    }

    fn dispatch_frame(&self, text: &str) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Error parsing WebSocket message: {}", e);
                return;
            }
        };
        match EventKind::from_wire(&envelope.kind) {
            Some(kind) => self.emit(kind, envelope.data),
            None => trace!("No handler kind for '{}' events", envelope.kind),
        }
    }

    fn emit(&self, kind: EventKind, data: Value) {
        // Clone out so the handler may (un)subscribe without deadlocking
        let handler = lock(&self.registry).get(kind);
        if let Some(handler) = handler {
            if catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                error!("Handler for '{}' events panicked; frame dropped", kind);
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.link).generation == generation
    }

    /// Updates the state if `generation` is still current.
    fn set_state(&self, generation: u64, state: ConnectionState) -> bool {
        let mut link = lock(&self.link);
        if link.generation != generation {
            return false;
        }
        link.state = state;
        true
    }
}
