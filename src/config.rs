//! Runtime configuration for the realtime channel and the REST client.
//!
//! Both configs default to the platform's local development endpoints and can
//! be overridden from the environment (see [`RealtimeConfig::from_env`] and
//! [`ApiConfig::from_env`]).

use crate::error::{AlumniError, Result};
use crate::websocket::backoff::ReconnectPolicy;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub const ENV_WS_URL: &str = "ALUMNI_WS_URL";
pub const ENV_API_BASE_URL: &str = "ALUMNI_API_BASE_URL";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "ALUMNI_WS_MAX_RECONNECT_ATTEMPTS";
pub const ENV_RECONNECT_BASE_DELAY_MS: &str = "ALUMNI_WS_RECONNECT_BASE_DELAY_MS";

#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeConfig {
    /// Base WebSocket endpoint, e.g. `wss://alumni.example.edu`.
    pub ws_base_url: String,
    pub reconnect: ReconnectPolicy,
    /// Upper bound for a single connection handshake.
    pub connect_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
        }
    }
}

impl RealtimeConfig {
    pub fn new(ws_base_url: &str) -> Result<Self> {
        validate_scheme(ws_base_url, &["ws", "wss"])?;
        Ok(Self {
            ws_base_url: ws_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        })
    }

    /// Reads `ALUMNI_WS_URL`, `ALUMNI_WS_MAX_RECONNECT_ATTEMPTS` and
    /// `ALUMNI_WS_RECONNECT_BASE_DELAY_MS`, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(ENV_WS_URL) {
            Ok(url) => Self::new(&url)?,
            Err(_) => Self::default(),
        };
        if let Some(max) = env_parse::<u32>(ENV_MAX_RECONNECT_ATTEMPTS)? {
            config.reconnect.max_attempts = max;
        }
        if let Some(ms) = env_parse::<u64>(ENV_RECONNECT_BASE_DELAY_MS)? {
            config.reconnect.base_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.reconnect.max_attempts = max_attempts;
        self
    }

    pub fn with_reconnect_base_delay(mut self, base_delay: Duration) -> Self {
        self.reconnect.base_delay = base_delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `<ws_base_url>/ws/notifications/<user_id>/`
    pub fn notification_url(&self, user_id: u64) -> Result<Url> {
        let url = format!(
            "{}/ws/notifications/{}/",
            self.ws_base_url.trim_end_matches('/'),
            user_id
        );
        Ok(Url::parse(&url)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout_sec: Option<u64>) -> Result<Self> {
        validate_scheme(base_url, &["http", "https"])?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    pub fn from_env() -> Result<Self> {
        match std::env::var(ENV_API_BASE_URL) {
            Ok(url) => Self::new(&url, None),
            Err(_) => Ok(Self::default()),
        }
    }
}

fn validate_scheme(raw: &str, allowed: &[&str]) -> Result<()> {
    let url = Url::parse(raw)?;
    if !allowed.contains(&url.scheme()) {
        return Err(AlumniError::ConfigError(format!(
            "Unsupported URL scheme '{}' in '{}'. Expected one of {:?}",
            url.scheme(),
            raw,
            allowed
        )));
    }
    Ok(())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AlumniError::ConfigError(format!("{} has an invalid value: '{}'", name, raw))
        }),
        Err(_) => Ok(None),
    }
}
