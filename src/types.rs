use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Enums ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    Alumni,
    Faculty,
    Admin,
    Recruiter,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Category of a notification as reported by the backend.
///
/// Values the backend adds later are kept verbatim in `Other` instead of
/// failing the whole payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    ConnectionRequest,
    ConnectionAccepted,
    PostLiked,
    PostCommented,
    PostShared,
    ProjectFunded,
    MentorshipRequest,
    MentorshipAccepted,
    ClubInvitation,
    EventReminder,
    System,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::ConnectionRequest => "connection_request",
            NotificationType::ConnectionAccepted => "connection_accepted",
            NotificationType::PostLiked => "post_liked",
            NotificationType::PostCommented => "post_commented",
            NotificationType::PostShared => "post_shared",
            NotificationType::ProjectFunded => "project_funded",
            NotificationType::MentorshipRequest => "mentorship_request",
            NotificationType::MentorshipAccepted => "mentorship_accepted",
            NotificationType::ClubInvitation => "club_invitation",
            NotificationType::EventReminder => "event_reminder",
            NotificationType::System => "system",
            NotificationType::Other(other) => other,
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "connection_request" => NotificationType::ConnectionRequest,
            "connection_accepted" => NotificationType::ConnectionAccepted,
            "post_liked" => NotificationType::PostLiked,
            "post_commented" => NotificationType::PostCommented,
            "post_shared" => NotificationType::PostShared,
            "project_funded" => NotificationType::ProjectFunded,
            "mentorship_request" => NotificationType::MentorshipRequest,
            "mentorship_accepted" => NotificationType::MentorshipAccepted,
            "club_invitation" => NotificationType::ClubInvitation,
            "event_reminder" => NotificationType::EventReminder,
            "system" => NotificationType::System,
            _ => NotificationType::Other(value),
        }
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

// --- Session / Auth ---

/// The signed-in user as returned by the auth endpoints and kept in the
/// session store under the `user` key.
///
/// Only `id` is required. Profile fields this crate does not model are kept
/// in `extra` so a stored user survives a round trip untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

// --- Notifications ---

/// Payload of a `notification` event and of the notifications list endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    // Only present on REST responses
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_sent: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct NotificationQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<NotificationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

// --- Response Structs ---

#[derive(Deserialize, Debug, Clone)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
