use axum::{
    Extension, Json,
    extract::{Query, State},
};

use tackboard_types::api::{Claims, SearchQuery, SearchResults};

use crate::state::AppState;
use crate::{ApiResult, run_blocking};

/// Combined keyword search over the requester's projects and their cards.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SearchResults>> {
    let db = state.db.clone();
    let user = claims.sub;
    let results = run_blocking(move || db.search(user, &query.keyword)).await?;
    Ok(Json(results))
}
