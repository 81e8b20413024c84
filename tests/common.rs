// tests/common.rs
use alumni_connector_rs::error::{AlumniError, Result};
use alumni_connector_rs::websocket::{Connection, Connector, OutboundFrame, TransportEvent};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

static INIT: Once = Once::new();

// Loads .env (if any) and initializes test logging once per test binary.
pub fn setup() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
        env_logger::builder().is_test(true).try_init().ok();
    });
}

/// The server half of a mock connection.
pub struct ServerEnd {
    pub url: Url,
    pub to_client: mpsc::Sender<TransportEvent>,
    pub from_client: mpsc::Receiver<OutboundFrame>,
}

#[allow(dead_code)]
impl ServerEnd {
    pub async fn push(&self, text: &str) {
        self.to_client
            .send(TransportEvent::Text(text.to_string()))
            .await
            .expect("client side of mock connection is gone");
    }

    pub async fn close(&self, code: Option<u16>) {
        let _ = self.to_client.send(TransportEvent::Closed(code)).await;
    }
}

#[derive(Default)]
struct MockState {
    attempts: Mutex<Vec<(Instant, Url)>>,
    refuse_all: AtomicBool,
    refuse_next: AtomicU32,
}

/// In-memory connector. Every accepted connection hands its server half to
/// the receiver returned by [`MockConnector::new`].
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

#[allow(dead_code)]
impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::new(MockState::default()),
                servers,
            },
            rx,
        )
    }

    /// Refuse every connection until called again with `false`.
    pub fn refuse_all(&self, refuse: bool) {
        self.state.refuse_all.store(refuse, Ordering::SeqCst);
    }

    /// Refuse the next `n` connections, then accept again.
    pub fn refuse_next(&self, n: u32) {
        self.state.refuse_next.store(n, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.state.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state
            .attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn attempt_urls(&self) -> Vec<Url> {
        self.state
            .attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Millisecond gaps between consecutive connection attempts.
    pub fn gaps_ms(&self) -> Vec<u128> {
        self.attempt_times()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_millis())
            .collect()
    }

    fn should_refuse(&self) -> bool {
        if self.state.refuse_all.load(Ordering::SeqCst) {
            return true;
        }
        self.state
            .refuse_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Connection> {
        self.state
            .attempts
            .lock()
            .unwrap()
            .push((Instant::now(), url.clone()));

        if self.should_refuse() {
            return Err(AlumniError::WebsocketError(
                "WebSocket connection failed: Connection refused".to_string(),
            ));
        }

        let (to_client, inbound) = mpsc::channel(32);
        let (outbound, from_client) = mpsc::channel(32);
        let _ = self.servers.send(ServerEnd {
            url: url.clone(),
            to_client,
            from_client,
        });
        Ok(Connection { outbound, inbound })
    }
}
