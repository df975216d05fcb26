use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use tackboard_types::api::Claims;
use tackboard_types::history::HistoryEntry;

use crate::state::AppState;
use crate::{ApiResult, run_blocking};

/// Project audit trail, newest first. Member-only.
pub async fn get_history(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let history = run_blocking(move || db.project_history(project_id, user)).await?;
    Ok(Json(history))
}
