use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CardStatus;

// -- JWT Claims --

/// Claims shared between the REST middleware and the WebSocket upgrade.
/// Canonical definition lives here to eliminate duplication. Tokens are
/// issued by the external auth service; this crate only describes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub nickname: String,
    pub exp: usize,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Option<NaiveDate>,
}

/// Partial update. A missing field is left unchanged; `"deadline": null`
/// clears the deadline.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondInvitationRequest {
    pub project_id: Uuid,
    pub accept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationItem {
    pub project_id: Uuid,
    pub name: String,
}

/// Desired id order for a reorder call, front of the board first.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub order: Vec<Uuid>,
}

// -- Cards --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<CardStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<CardStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: CardStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveCardRequest {
    pub card_id: Uuid,
    pub from_project_id: Uuid,
    pub to_project_id: Uuid,
    /// Full card order of the destination project, moved card included.
    pub order: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDueDateRequest {
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDueDateRequest {
    pub new_due_date: NaiveDate,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub content: String,
    pub card_id: Option<Uuid>,
    /// Blob reference produced by the external file store.
    pub attachment: Option<String>,
}

/// `"attachment": null` removes the current attachment; a missing field
/// keeps it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditCommentRequest {
    pub content: String,
    #[serde(default, with = "double_option")]
    pub attachment: Option<Option<String>>,
}

// -- Search --

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectHit {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardHit {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub projects: Vec<ProjectHit>,
    pub cards: Vec<CardHit>,
}

/// Distinguishes "field absent" from "field set to null" during
/// deserialization; serde collapses both to `None` by default.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
