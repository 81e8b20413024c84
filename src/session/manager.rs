use super::store::{self, SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use crate::error::{AlumniError, Result};
use crate::rest::ApiClient;
use crate::types::{LoginRequest, Notification, User};
use crate::websocket::NotificationClient;
use log::*;
use std::sync::Arc;

pub type NotificationHandler = Arc<dyn Fn(Notification) + Send + Sync + 'static>;

/// Owns the user session and ties the realtime channel to it.
///
/// The notification client is started once a user is known (after
/// [`login`](Self::login) or a successful [`restore`](Self::restore)) and
/// torn down by [`logout`](Self::logout).
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    notifications: NotificationClient,
    on_notification: NotificationHandler,
}

impl SessionManager {
    pub fn new(
        api: ApiClient,
        store: Arc<dyn SessionStore>,
        notifications: NotificationClient,
        on_notification: NotificationHandler,
    ) -> Self {
        Self {
            api,
            store,
            notifications,
            on_notification,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifications(&self) -> &NotificationClient {
        &self.notifications
    }

    pub fn current_user(&self) -> Option<User> {
        store::current_user(self.store.as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Logs in, persists tokens and user, and starts the realtime channel.
    pub async fn login(&mut self, credentials: &LoginRequest<'_>) -> Result<User> {
        let response = self.api.login(credentials).await.map_err(|e| {
            error!("Login failed: {}", e);
            e
        })?;

        self.store.set(ACCESS_TOKEN_KEY, &response.tokens.access)?;
        self.store.set(REFRESH_TOKEN_KEY, &response.tokens.refresh)?;
        store::save_user(self.store.as_ref(), &response.user)?;
        self.api.set_access_token(Some(response.tokens.access));

        info!("Logged in as user {}", response.user.id);
        self.start_realtime();
        Ok(response.user)
    }

    /// Resumes a persisted session.
    ///
    /// Returns `Ok(None)` when no access token is stored. If the stored token
    /// is rejected, every persisted session key is cleared and the error is
    /// returned.
    pub async fn restore(&mut self) -> Result<Option<User>> {
        let Some(token) = self.store.get(ACCESS_TOKEN_KEY) else {
            return Ok(None);
        };
        self.api.set_access_token(Some(token));

        match self.api.get_profile().await {
            Ok(user) => {
                store::save_user(self.store.as_ref(), &user)?;
                self.start_realtime();
                Ok(Some(user))
            }
            Err(e) => {
                error!("Failed to restore session: {}", e);
                self.api.set_access_token(None);
                self.clear_persisted();
                Err(e)
            }
        }
    }

    /// Re-fetches the profile and persists it.
    pub async fn refresh_user(&self) -> Result<User> {
        if self.api.access_token().is_none() {
            return Err(AlumniError::SessionError("Not logged in".to_string()));
        }
        let user = self.api.get_profile().await?;
        store::save_user(self.store.as_ref(), &user)?;
        Ok(user)
    }

    /// Subscribes the notification handler and connects the realtime channel.
    /// Does nothing useful until a user is persisted.
    pub fn start_realtime(&self) {
        let handler = Arc::clone(&self.on_notification);
        self.notifications
            .subscribe_notifications(move |notification| handler(notification));
        self.notifications.connect();
    }

    /// Disconnects the realtime channel and forgets the session. Never fails;
    /// storage errors are logged.
    pub async fn logout(&mut self) {
        self.notifications.disconnect().await;
        self.api.set_access_token(None);
        self.clear_persisted();
        info!("Logged out");
    }

    fn clear_persisted(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to clear '{}' from session store: {}", key, e);
            }
        }
    }
}
