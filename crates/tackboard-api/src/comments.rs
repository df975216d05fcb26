use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use tackboard_types::api::{AddCommentRequest, Claims, EditCommentRequest};
use tackboard_types::events::{GatewayEvent, Room};
use tackboard_types::models::Comment;

use crate::state::AppState;
use crate::{ApiResult, run_blocking};

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    pub card_id: Option<Uuid>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<CommentQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Comment>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let comments =
        run_blocking(move || db.list_comments(project_id, user, query.card_id)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let comment = run_blocking(move || {
        db.add_comment(
            project_id,
            req.card_id,
            user,
            &req.content,
            req.attachment.as_deref(),
        )
    })
    .await?;

    state
        .dispatcher
        .publish(
            Room::Project(project_id),
            GatewayEvent::CommentCreated {
                project_id,
                comment: comment.clone(),
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let edit = run_blocking(move || {
        let attachment = req.attachment.as_ref().map(|a| a.as_deref());
        db.edit_comment(comment_id, user, &req.content, attachment)
    })
    .await?;

    // The replaced blob belongs to no one now; hand it to the storage
    // collaborator once the edit is durable.
    if let Some(reference) = &edit.removed_attachment {
        if let Err(e) = state.blobs.delete_blob(reference) {
            warn!("failed to delete blob {}: {}", reference, e);
        }
    }

    state
        .dispatcher
        .publish(
            Room::Project(edit.project_id),
            GatewayEvent::CommentUpdated {
                project_id: edit.project_id,
                comment_id,
                new_content: edit.new_content.clone(),
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let deleted = run_blocking(move || db.delete_comment(comment_id, user)).await?;

    if let Some(reference) = &deleted.attachment {
        if let Err(e) = state.blobs.delete_blob(reference) {
            warn!("failed to delete blob {}: {}", reference, e);
        }
    }

    state
        .dispatcher
        .publish(
            Room::Project(deleted.project_id),
            GatewayEvent::CommentDeleted {
                project_id: deleted.project_id,
                comment_id,
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
