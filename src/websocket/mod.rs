//! Realtime notification channel for the alumni network.
//!
//! [`NotificationClient`] keeps one WebSocket connection per signed-in user
//! open against `<ws_base_url>/ws/notifications/<user-id>/` and delivers the
//! server's `{ "type": ..., "data": ... }` envelopes to subscribers.
//!
//! # Usage
//!
//! ```no_run
//! use alumni_connector_rs::config::RealtimeConfig;
//! use alumni_connector_rs::session::store::{MemorySessionStore, SessionStore};
//! use alumni_connector_rs::websocket::{EventKind, NotificationClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemorySessionStore::new());
//!     // Normally written by the session layer after login
//!     store.set("user", r#"{"id": 42}"#).unwrap();
//!
//!     let client = NotificationClient::new(RealtimeConfig::default(), store);
//!     client.subscribe_notifications(|n| println!("{}: {}", n.title, n.message));
//!     client.subscribe(EventKind::ConnectionLost, |data| {
//!         eprintln!("Realtime channel gave up: {}", data);
//!     });
//!     client.connect();
//!
//!     tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
//!     client.disconnect().await;
//! }
//! ```
//!
//! # Reconnection Behavior
//!
//! - A close with any code other than 1000 (normal closure), or a failed
//!   handshake, schedules a reconnect.
//! - Attempt `n` waits `base_delay * 2^(n-1)`: 1s, 2s, 4s, 8s, 16s with the
//!   defaults.
//! - After `max_attempts` (default 5) the client stays disconnected, emits
//!   [`EventKind::ConnectionLost`] and waits for an explicit
//!   [`NotificationClient::reconnect`].
//! - A successful open resets the counter.
//! - Subscriptions survive automatic reconnects.
//!   [`NotificationClient::disconnect`] and [`NotificationClient::reconnect`]
//!   clear them.
//! - A panicking handler is logged; the connection keeps delivering.
//! - Dropping the client closes an open connection with code 1000.

pub mod backoff;
pub mod client;
pub mod event;
pub mod registry;
pub mod transport;

// Re-export the client types for easier access
pub use backoff::ReconnectPolicy;
pub use client::{ConnectionState, NotificationClient};
pub use event::{Envelope, EventKind};
pub use registry::{EventHandler, SubscriberRegistry};
pub use transport::{
    Connection, Connector, OutboundFrame, TransportEvent, TungsteniteConnector, NORMAL_CLOSURE,
};
