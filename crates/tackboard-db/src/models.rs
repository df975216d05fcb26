//! Database row types — these map directly to SQLite rows.
//! Distinct from the tackboard-types API models to keep the storage layer
//! independent; conversion helpers below do the lossy parsing in one place.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use tackboard_types::models::{Card, CardStatus, ChatMessage, Comment, Notification};

pub struct UserRow {
    pub id: String,
    pub nickname: String,
    pub created_at: String,
}

pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub deadline: Option<String>,
    pub owner_id: String,
    pub created_at: String,
}

pub struct CardRow {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub position: i64,
    pub created_by: String,
    pub due_date: Option<String>,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub project_id: String,
    pub card_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub attachment: Option<String>,
    pub created_at: String,
}

pub struct HistoryRow {
    pub id: String,
    pub project_id: String,
    pub card_id: Option<String>,
    pub user_id: String,
    /// Resolved via LEFT JOIN at query time; None when the author is gone.
    pub nickname: Option<String>,
    pub action: String,
    pub details: String,
    pub created_at: String,
}

pub struct ChatMessageRow {
    pub project_id: String,
    pub user_id: String,
    pub nickname: String,
    pub message: String,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

/// Parse a stored id, falling back to the nil UUID on corruption so a
/// single bad row cannot poison a whole listing.
pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as `YYYY-MM-DD HH:MM:SS` without timezone.
/// Try RFC 3339 first, then parse as naive UTC and convert.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("Corrupt date '{}': {}", raw, e);
            None
        }
    }
}

impl CardRow {
    pub fn into_card(self) -> Card {
        Card {
            id: parse_uuid(&self.id, "card id"),
            project_id: parse_uuid(&self.project_id, "project_id"),
            title: self.title,
            description: self.description,
            status: CardStatus::parse(&self.status),
            position: self.position,
            created_by: parse_uuid(&self.created_by, "created_by"),
            due_date: self.due_date.as_deref().and_then(parse_date),
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

impl CommentRow {
    pub fn into_comment(self) -> Comment {
        Comment {
            id: parse_uuid(&self.id, "comment id"),
            project_id: parse_uuid(&self.project_id, "project_id"),
            card_id: self.card_id.map(|id| parse_uuid(&id, "card_id")),
            author_id: parse_uuid(&self.author_id, "author_id"),
            author_name: self.author_name,
            content: self.content,
            attachment: self.attachment,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

impl ChatMessageRow {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            project_id: parse_uuid(&self.project_id, "project_id"),
            user_id: parse_uuid(&self.user_id, "user_id"),
            nickname: self.nickname,
            message: self.message,
            timestamp: parse_timestamp(&self.created_at),
        }
    }
}

impl NotificationRow {
    pub fn into_notification(self) -> Option<Notification> {
        let body = match serde_json::from_str(&self.body) {
            Ok(body) => body,
            Err(e) => {
                warn!("Corrupt notification body '{}': {}", self.id, e);
                return None;
            }
        };
        Some(Notification {
            id: parse_uuid(&self.id, "notification id"),
            user_id: parse_uuid(&self.user_id, "user_id"),
            body,
            read: self.read,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}
