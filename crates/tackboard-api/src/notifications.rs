use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use tackboard_types::api::Claims;
use tackboard_types::models::Notification;

use crate::state::AppState;
use crate::{ApiResult, run_blocking};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

/// Pull side of the personal notification room: whatever was persisted
/// while the user was away.
pub async fn get_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Notification>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let notifications =
        run_blocking(move || db.list_notifications(user, query.unread)).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let marked = run_blocking(move || db.mark_notifications_read(user)).await?;
    Ok(Json(serde_json::json!({ "read": marked })))
}
