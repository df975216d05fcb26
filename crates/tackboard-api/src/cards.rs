use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tackboard_db::StoreError;
use tackboard_types::api::{
    Claims, CreateCardRequest, MoveCardRequest, ReorderRequest, SetDueDateRequest,
    UpdateCardRequest, UpdateDueDateRequest, UpdateStatusRequest,
};
use tackboard_types::events::{GatewayEvent, Room};
use tackboard_types::history::CardChanges;
use tackboard_types::models::Card;

use crate::state::AppState;
use crate::{ApiError, ApiResult, run_blocking};

pub async fn create_card(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let card = run_blocking(move || {
        db.create_card(
            project_id,
            user,
            &req.title,
            &req.description,
            req.status.unwrap_or_default(),
        )
    })
    .await?;

    state
        .dispatcher
        .publish(
            Room::Project(project_id),
            GatewayEvent::CardCreated {
                project_id,
                card: card.clone(),
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn list_cards(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Card>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let cards = run_blocking(move || db.list_cards(project_id, user)).await?;
    Ok(Json(cards))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Card>> {
    let db = state.db.clone();
    let user = claims.sub;
    let card = run_blocking(move || db.get_card(project_id, card_id, user)).await?;
    Ok(Json(card))
}

pub async fn list_all_cards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Card>>> {
    let db = state.db.clone();
    let user = claims.sub;
    let cards = run_blocking(move || db.list_all_cards(user)).await?;
    Ok(Json(cards))
}

pub async fn card_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let counts = run_blocking(move || db.card_counts(user)).await?;
    let counts: HashMap<Uuid, i64> = counts.into_iter().collect();
    Ok(Json(serde_json::json!({ "counts": counts })))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let changes = run_blocking(move || {
        db.update_card(
            project_id,
            card_id,
            user,
            req.title.as_deref(),
            req.description.as_deref(),
            req.status,
        )
    })
    .await?;

    publish_card_update(&state, project_id, card_id, &claims, &changes).await;
    Ok(Json(changes))
}

pub async fn update_card_status(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let change =
        run_blocking(move || db.update_card_status(project_id, card_id, user, req.status)).await?;

    let changes = CardChanges {
        status: change,
        ..Default::default()
    };
    publish_card_update(&state, project_id, card_id, &claims, &changes).await;
    Ok(Json(changes))
}

/// The mover must be a member of both boards; the destination order list
/// already contains the card. Announced to both rooms when they differ.
pub async fn move_card(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MoveCardRequest>,
) -> ApiResult<impl IntoResponse> {
    if project_id != req.from_project_id {
        return Err(ApiError(StoreError::Validation(
            "path project does not match source project".into(),
        )));
    }

    let db = state.db.clone();
    let user = claims.sub;
    let (card_id, from, to) = (req.card_id, req.from_project_id, req.to_project_id);
    run_blocking(move || db.move_card(card_id, user, from, to, &req.order)).await?;

    let event = GatewayEvent::CardMoved {
        card_id,
        from_project_id: from,
        to_project_id: to,
        user_id: claims.sub,
        nickname: claims.nickname.clone(),
        timestamp: chrono::Utc::now(),
    };
    state
        .dispatcher
        .publish(Room::Project(to), event.clone())
        .await;
    if from != to {
        state.dispatcher.publish(Room::Project(from), event).await;
    }

    Ok(Json(serde_json::json!({ "moved": true })))
}

pub async fn reorder_cards(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    run_blocking(move || db.reorder_cards(project_id, user, &req.order)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_due_date(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetDueDateRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let due_date = req.due_date;
    let changed =
        run_blocking(move || db.set_due_date(project_id, card_id, user, due_date)).await?;

    if changed {
        state
            .dispatcher
            .publish(
                Room::Project(project_id),
                GatewayEvent::DueDateSet {
                    project_id,
                    card_id,
                    due_date,
                    user_id: claims.sub,
                    nickname: claims.nickname.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await;
    }

    Ok(Json(serde_json::json!({ "due_date": due_date })))
}

pub async fn update_due_date(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateDueDateRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    let new_due_date = req.new_due_date;
    let old =
        run_blocking(move || db.update_due_date(project_id, card_id, user, new_due_date)).await?;

    if let Some(old_due_date) = old {
        state
            .dispatcher
            .publish(
                Room::Project(project_id),
                GatewayEvent::DueDateUpdated {
                    project_id,
                    card_id,
                    old_due_date,
                    new_due_date,
                    user_id: claims.sub,
                    nickname: claims.nickname.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await;
    }

    Ok(Json(serde_json::json!({ "new_due_date": new_due_date })))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path((project_id, card_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user = claims.sub;
    run_blocking(move || db.delete_card(project_id, card_id, user)).await?;

    state
        .dispatcher
        .publish(
            Room::Project(project_id),
            GatewayEvent::CardDeleted {
                project_id,
                card_id,
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn publish_card_update(
    state: &AppState,
    project_id: Uuid,
    card_id: Uuid,
    claims: &Claims,
    changes: &CardChanges,
) {
    if changes.is_empty() {
        return;
    }
    state
        .dispatcher
        .publish(
            Room::Project(project_id),
            GatewayEvent::CardUpdated {
                project_id,
                card_id,
                changes: changes.clone(),
                user_id: claims.sub,
                nickname: claims.nickname.clone(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;
}
