use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub owner_id: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Board column a card sits in. The set is open: clients may introduce
/// statuses beyond the three built-in columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Todo,
    InProgress,
    Done,
    #[serde(untagged)]
    Other(String),
}

impl CardStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "todo" => Self::Todo,
            "in_progress" => Self::InProgress,
            "done" => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::Todo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: CardStatus,
    /// Board position within the owning project, zero-based.
    pub position: i64,
    pub created_by: Uuid,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// `author_name` is snapshotted at write time; a later nickname change does
/// not rewrite existing comments. History entries do the opposite (resolved
/// at query time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub card_id: Option<Uuid>,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    /// Opaque reference into the external blob store.
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub nickname: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationBody {
    ProjectInvite {
        project_id: Uuid,
        project_name: String,
        inviter_id: Uuid,
        inviter_nickname: String,
    },
}

/// Persisted before publish so a disconnected user still sees it on the
/// next pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub body: NotificationBody,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
