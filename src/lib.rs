pub mod config;
pub mod error;
pub mod rest;
pub mod session;
pub mod types;
pub mod websocket;
pub use error::{AlumniError, Result};
