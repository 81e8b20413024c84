use crate::config::ApiConfig;
use crate::error::{AlumniError, Result};
use crate::types::*;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// A client for the slice of the alumni platform REST API used by the
/// notification feature and the session layer.
///
/// Requests carry `Authorization: Bearer <token>` once an access token is
/// set. The token is passed through as-is.
///
/// # Examples
///
/// ```no_run
/// use alumni_connector_rs::rest::ApiClient;
/// use alumni_connector_rs::types::LoginRequest;
///
/// #[tokio::main]
/// async fn main() {
///     let mut client = ApiClient::new("http://localhost:8000/api", None)
///         .expect("Failed to create client");
///
///     let auth = client
///         .login(&LoginRequest { email: "ada@example.edu", password: "secret" })
///         .await
///         .expect("Login failed");
///     client.set_access_token(Some(auth.tokens.access));
///
///     let page = client.get_notifications(None).await.expect("Failed to list");
///     println!("{} notifications", page.count);
/// }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client used for making requests.
    http_client: HttpClient,
    /// Base URL including any path prefix, without trailing slash.
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Creates a new client for `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// `timeout_sec` defaults to 10 seconds.
    pub fn new(base_url: &str, timeout_sec: Option<u64>) -> Result<Self> {
        Self::from_config(&ApiConfig::new(base_url, timeout_sec)?)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    fn build_request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Request> {
        let url = self.endpoint(path)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.access_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        let mut request_builder = self.http_client.request(method, url).headers(headers);
        if let Some(b) = body {
            request_builder = request_builder.json(b);
        }
        Ok(request_builder.build()?)
    }

    async fn send_request<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let response = self.http_client.execute(request).await?;
        Self::handle_response(response).await
    }

    /// Parses a success body, or maps a non-2xx status to
    /// `ClientError`/`ServerError` with the body's `error` or `message` text.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let (message, data) = match response.json::<Value>().await {
            Ok(body) => {
                let message = body["error"]
                    .as_str()
                    .or_else(|| body["message"].as_str())
                    .or_else(|| body["detail"].as_str())
                    .unwrap_or("API request failed")
                    .to_string();
                (message, Some(body))
            }
            Err(_) => (
                format!(
                    "Request failed with status {} (could not parse error body)",
                    status
                ),
                None,
            ),
        };

        if status.is_client_error() {
            Err(AlumniError::ClientError {
                status,
                message,
                data,
            })
        } else {
            Err(AlumniError::ServerError { status, message })
        }
    }

    // --- Auth ---

    /// POST /auth/login/
    pub async fn login(&self, credentials: &LoginRequest<'_>) -> Result<AuthResponse> {
        let request = self.build_request(Method::POST, "/auth/login/", Some(credentials))?;
        self.send_request::<AuthResponse>(request).await
    }

    /// GET /auth/profile/
    pub async fn get_profile(&self) -> Result<User> {
        let request = self.build_request::<()>(Method::GET, "/auth/profile/", None)?;
        self.send_request::<User>(request).await
    }

    // --- Notifications ---

    /// Lists the signed-in user's notifications, newest first.
    /// GET /notifications/?<query>
    pub async fn get_notifications(
        &self,
        params: Option<&NotificationQuery<'_>>,
    ) -> Result<PaginatedResponse<Notification>> {
        let mut path = "/notifications/".to_string();
        if let Some(p) = params {
            match serde_qs::to_string(p) {
                Ok(query) if !query.is_empty() => {
                    path.push('?');
                    path.push_str(&query);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to serialize NotificationQuery to query string: {}", e),
            }
        }
        let request = self.build_request::<()>(Method::GET, &path, None)?;
        self.send_request::<PaginatedResponse<Notification>>(request)
            .await
    }

    /// POST /notifications/{id}/mark-read/
    pub async fn mark_notification_read(&self, notification_id: u64) -> Result<()> {
        let path = format!("/notifications/{}/mark-read/", notification_id);
        let request = self.build_request::<()>(Method::POST, &path, None)?;
        self.send_request::<Value>(request).await?;
        Ok(())
    }

    /// POST /notifications/mark-all-read/
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        let request =
            self.build_request::<()>(Method::POST, "/notifications/mark-all-read/", None)?;
        self.send_request::<Value>(request).await?;
        Ok(())
    }
}
