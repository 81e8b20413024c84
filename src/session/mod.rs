//! Persisted session state and the session manager that owns the realtime
//! notification channel.

pub mod manager;
pub mod store;

pub use manager::{NotificationHandler, SessionManager};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
