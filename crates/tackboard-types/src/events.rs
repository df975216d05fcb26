use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::{CardChanges, ProjectChanges};
use crate::models::{Card, ChatMessage, Comment, Notification};

/// Broadcast target. Every outbound event is addressed to exactly one room:
/// either a project's room or a user's personal notification room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Project(Uuid),
    User(Uuid),
}

/// Events sent over the WebSocket gateway. Published only after the
/// triggering mutation has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated
    Ready { user_id: Uuid, nickname: String },

    ProjectCreated {
        project_id: Uuid,
        name: String,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    ProjectUpdated {
        project_id: Uuid,
        changes: ProjectChanges,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    ProjectDeleted {
        project_id: Uuid,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    /// An invitee accepted or declined, announced to the project room
    InviteResponse {
        project_id: Uuid,
        user_id: Uuid,
        nickname: String,
        accepted: bool,
        timestamp: DateTime<Utc>,
    },

    CardCreated {
        project_id: Uuid,
        card: Card,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CardUpdated {
        project_id: Uuid,
        card_id: Uuid,
        changes: CardChanges,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CardMoved {
        card_id: Uuid,
        from_project_id: Uuid,
        to_project_id: Uuid,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CardDeleted {
        project_id: Uuid,
        card_id: Uuid,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    DueDateSet {
        project_id: Uuid,
        card_id: Uuid,
        due_date: NaiveDate,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    DueDateUpdated {
        project_id: Uuid,
        card_id: Uuid,
        old_due_date: Option<NaiveDate>,
        new_due_date: NaiveDate,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CommentCreated {
        project_id: Uuid,
        comment: Comment,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CommentUpdated {
        project_id: Uuid,
        comment_id: Uuid,
        new_content: String,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    CommentDeleted {
        project_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
        nickname: String,
        timestamp: DateTime<Utc>,
    },

    /// A chat message posted to a project room
    Message(ChatMessage),

    /// Ephemeral error/info aimed at a single connection or room
    Notice {
        msg: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        project_id: Option<Uuid>,
    },

    /// Persisted, user-targeted event (invitations and the like)
    Notification(Notification),

    /// Recent chat replayed to a connection when it joins a room,
    /// oldest first
    ChatHistory(Vec<ChatMessage>),
}

/// Commands sent FROM client TO server over the WebSocket. Everything else
/// goes through the REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Subscribe to a project room (membership is checked server-side)
    Join { project_id: Uuid },

    /// Unsubscribe from a project room
    Leave { project_id: Uuid },

    /// Post a chat message to a project room
    SendMessage { project_id: Uuid, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_snake_case_on_the_wire() {
        let event = GatewayEvent::CardDeleted {
            project_id: Uuid::new_v4(),
            card_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            nickname: "mina".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "card_deleted");
        assert!(json["data"]["card_id"].is_string());
    }

    #[test]
    fn commands_round_trip() {
        let raw = r#"{"type":"send_message","data":{"project_id":"00000000-0000-0000-0000-000000000001","message":"hi"}}"#;
        let cmd: GatewayCommand = serde_json::from_str(raw).unwrap();
        match cmd {
            GatewayCommand::SendMessage { message, .. } => assert_eq!(message, "hi"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
