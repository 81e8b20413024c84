use alumni_connector_rs::config::{ApiConfig, RealtimeConfig};
use alumni_connector_rs::rest::ApiClient;
use alumni_connector_rs::session::store::FileSessionStore;
use alumni_connector_rs::session::SessionManager;
use alumni_connector_rs::types::{LoginRequest, Notification};
use alumni_connector_rs::websocket::{EventKind, NotificationClient};
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenv::dotenv().ok();

    let realtime = RealtimeConfig::from_env()?;
    let api = ApiClient::from_config(&ApiConfig::from_env()?)?;
    let session_path =
        env::var("ALUMNI_SESSION_FILE").unwrap_or_else(|_| "alumni_session.json".to_string());
    let store = Arc::new(FileSessionStore::open(&session_path)?);

    let notifications = NotificationClient::new(realtime, store.clone());
    notifications.subscribe(EventKind::ConnectionLost, |data| {
        error!("Realtime channel lost after {} attempts", data["attempts"]);
    });

    let mut manager = SessionManager::new(
        api,
        store,
        notifications,
        Arc::new(|n: Notification| {
            info!(
                "[{:?}] {} - {} ({})",
                n.priority,
                n.title,
                n.message,
                n.notification_type.as_str()
            );
        }),
    );

    let user = match manager.restore().await {
        Ok(Some(user)) => user,
        Ok(None) | Err(_) => {
            let email = env::var("ALUMNI_EMAIL").map_err(|_| "ALUMNI_EMAIL must be set")?;
            let password =
                env::var("ALUMNI_PASSWORD").map_err(|_| "ALUMNI_PASSWORD must be set")?;
            manager
                .login(&LoginRequest {
                    email: &email,
                    password: &password,
                })
                .await?
        }
    };
    info!("Listening for notifications for user {}", user.id);

    match manager.api().get_notifications(None).await {
        Ok(page) => {
            let unread = page.results.iter().filter(|n| !n.is_read).count();
            info!("{} notifications on record, {} unread on this page", page.count, unread);
        }
        Err(e) => warn!("Could not fetch notification history: {}", e),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    if env::var("ALUMNI_LOGOUT_ON_EXIT").is_ok() {
        manager.logout().await;
    } else {
        manager.notifications().disconnect().await;
    }
    Ok(())
}
