use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tackboard_db::projects::DeleteOutcome;
use tackboard_types::api::{
    Claims, CreateProjectRequest, EditProjectRequest, InvitationItem, InviteRequest,
    ReorderRequest, RespondInvitationRequest,
};
use tackboard_types::events::{GatewayEvent, Room};
use tackboard_types::models::Project;

use crate::state::AppState;
use crate::{ApiResult, run_blocking};

pub async fn create_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let owner = claims.sub;
    let project = run_blocking(move || {
        db.create_project(owner, &req.name, &req.description, req.deadline)
    })
    .await?;

    state
        .dispatcher
        .publish(
            Room::Project(project.id),
            GatewayEvent::ProjectCreated {
                project_id: project.id,
                name: project.name.clone(),
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Project>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let projects = run_blocking(move || db.list_projects(user)).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Project>> {
    let db = state.db.clone();
    let user = claims.sub;
    let project = run_blocking(move || db.get_project(project_id, user)).await?;
    Ok(Json(project))
}

/// Owner deletes, member leaves; the event only goes out for a real delete.
pub async fn delete_or_leave_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let outcome = run_blocking(move || db.delete_or_leave_project(project_id, user)).await?;

    let deleted = outcome == DeleteOutcome::Deleted;
    if deleted {
        state
            .dispatcher
            .publish(
                Room::Project(project_id),
                GatewayEvent::ProjectDeleted {
                    project_id,
                    user_id: claims.sub,
                    nickname: claims.nickname.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await;
    }

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn edit_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let changes = run_blocking(move || {
        db.edit_project(
            project_id,
            user,
            req.name.as_deref(),
            req.description.as_deref(),
            req.deadline,
        )
    })
    .await?;

    if !changes.is_empty() {
        state
            .dispatcher
            .publish(
                Room::Project(project_id),
                GatewayEvent::ProjectUpdated {
                    project_id,
                    changes: changes.clone(),
                    user_id: claims.sub,
                    nickname: claims.nickname.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await;
    }

    Ok(Json(changes))
}

pub async fn reorder_projects(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    run_blocking(move || db.reorder_projects(user, &req.order)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite_member(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let inviter = claims.sub;
    let notification =
        run_blocking(move || db.invite_member(project_id, inviter, &req.nickname)).await?;

    // Already persisted; the push is a best-effort nudge on top.
    state
        .dispatcher
        .publish(
            Room::User(notification.user_id),
            GatewayEvent::Notification(notification),
        )
        .await;

    Ok(Json(serde_json::json!({ "invited": true })))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<InvitationItem>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let invitations = run_blocking(move || db.invitations_for(user)).await?;
    Ok(Json(invitations))
}

pub async fn respond_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondInvitationRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let project_id = req.project_id;
    let accept = req.accept;
    run_blocking(move || db.respond_invitation(project_id, user, accept)).await?;

    state
        .dispatcher
        .publish(
            Room::Project(project_id),
            GatewayEvent::InviteResponse {
                project_id,
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                accepted: accept,
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok(Json(serde_json::json!({ "accepted": accept })))
}
