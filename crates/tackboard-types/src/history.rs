use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One field-level diff captured by an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub from: T,
    pub to: T,
}

/// Field diffs for a card edit. Only fields that actually changed are
/// present; statuses are carried as strings because the status set is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FieldChange<String>>,
}

impl CardChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Field diffs for a project edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<FieldChange<Option<NaiveDate>>>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.deadline.is_none()
    }
}

/// Structured payload of one audit entry, one variant per action kind.
/// The serialized form carries the action name as its tag, so consumers
/// never need to probe free-form maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HistoryDetails {
    Create {
        project_name: String,
        nickname: String,
    },
    Invite {
        project_name: String,
        nickname: String,
        invitee: String,
    },
    Join {
        project_name: String,
        nickname: String,
    },
    Leave {
        project_name: String,
        nickname: String,
    },
    ProjectUpdate {
        #[serde(flatten)]
        changes: ProjectChanges,
    },
    CardCreate {
        title: String,
        status: String,
        project_name: String,
    },
    CardUpdate {
        #[serde(flatten)]
        changes: CardChanges,
    },
    CardStatusUpdate {
        from_status: String,
        to_status: String,
        title: String,
    },
    CardMoveIn {
        from_project: String,
        to_project: String,
        title: String,
    },
    CardMoveOut {
        from_project: String,
        to_project: String,
        title: String,
    },
    CardReorder {
        title: String,
        new_order: i64,
    },
    CardDelete {
        title: String,
    },
    CardDueDateSet {
        title: String,
        due_date: NaiveDate,
    },
    CardDueDateUpdate {
        title: String,
        old_due_date: Option<NaiveDate>,
        new_due_date: NaiveDate,
    },
    CommentCreate {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_title: Option<String>,
    },
    CommentUpdate {
        old_content: String,
        new_content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_title: Option<String>,
    },
    CommentDelete {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_title: Option<String>,
    },
}

impl HistoryDetails {
    /// Stable action name, stored alongside the payload for filtering.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Invite { .. } => "invite",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::ProjectUpdate { .. } => "project_update",
            Self::CardCreate { .. } => "card_create",
            Self::CardUpdate { .. } => "card_update",
            Self::CardStatusUpdate { .. } => "card_status_update",
            Self::CardMoveIn { .. } => "card_move_in",
            Self::CardMoveOut { .. } => "card_move_out",
            Self::CardReorder { .. } => "card_reorder",
            Self::CardDelete { .. } => "card_delete",
            Self::CardDueDateSet { .. } => "card_due_date_set",
            Self::CardDueDateUpdate { .. } => "card_due_date_update",
            Self::CommentCreate { .. } => "comment_create",
            Self::CommentUpdate { .. } => "comment_update",
            Self::CommentDelete { .. } => "comment_delete",
        }
    }
}

/// One audit entry as returned to members. `user` is the author's nickname
/// resolved at query time, not a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub card_id: Option<Uuid>,
    pub user_id: Uuid,
    pub user: String,
    pub details: HistoryDetails,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_tag_matches_action_name() {
        let details = HistoryDetails::CardStatusUpdate {
            from_status: "todo".into(),
            to_status: "done".into(),
            title: "ship it".into(),
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["action"], details.action());
        assert_eq!(json["from_status"], "todo");

        let back: HistoryDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }

    #[test]
    fn card_changes_flatten_into_update_payload() {
        let details = HistoryDetails::CardUpdate {
            changes: CardChanges {
                title: Some(FieldChange {
                    from: "old".into(),
                    to: "new".into(),
                }),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["action"], "card_update");
        assert_eq!(json["title"]["from"], "old");
        assert!(json.get("description").is_none());
    }
}
