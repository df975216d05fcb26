use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tackboard_api::blobs::DiscardBlobStore;
use tackboard_api::middleware::require_auth;
use tackboard_api::state::{AppState, AppStateInner};
use tackboard_api::{cards, comments, history, notifications, projects, search};
use tackboard_gateway::connection;
use tackboard_gateway::dispatcher::Dispatcher;
use tackboard_types::api::Claims;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tackboard=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("TACKBOARD_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TACKBOARD_DB_PATH").unwrap_or_else(|_| "tackboard.db".into());
    let host = std::env::var("TACKBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TACKBOARD_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(tackboard_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        dispatcher: dispatcher.clone(),
        jwt_secret,
        blobs: Arc::new(DiscardBlobStore),
    });

    // Routes
    let api_routes = Router::new()
        .route(
            "/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/projects/reorder", post(projects::reorder_projects))
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .put(projects::edit_project)
                .delete(projects::delete_or_leave_project),
        )
        .route("/projects/{project_id}/invite", post(projects::invite_member))
        .route("/invitations", get(projects::list_invitations))
        .route("/invitations/respond", post(projects::respond_invitation))
        .route("/projects/{project_id}/history", get(history::get_history))
        .route(
            "/projects/{project_id}/cards",
            post(cards::create_card).get(cards::list_cards),
        )
        .route("/projects/{project_id}/cards/move", post(cards::move_card))
        .route(
            "/projects/{project_id}/cards/reorder",
            post(cards::reorder_cards),
        )
        .route(
            "/projects/{project_id}/cards/{card_id}",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route(
            "/projects/{project_id}/cards/{card_id}/status",
            put(cards::update_card_status),
        )
        .route(
            "/projects/{project_id}/cards/{card_id}/due_date",
            put(cards::set_due_date).patch(cards::update_due_date),
        )
        .route("/cards", get(cards::list_all_cards))
        .route("/cards/counts", get(cards::card_counts))
        .route(
            "/projects/{project_id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/comments/{comment_id}",
            put(comments::edit_comment).delete(comments::delete_comment),
        )
        .route("/notifications", get(notifications::get_notifications))
        .route("/notifications/read", post(notifications::mark_read))
        .route("/search", get(search::search))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(app_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Tackboard server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct GatewayParams {
    token: String,
}

/// The token is validated here at the upgrade layer, so the socket handler
/// starts out authenticated.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<GatewayParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let token_data = decode::<Claims>(
        &params.token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let claims = token_data.claims;

    // Materialize the identity before the socket starts issuing member
    // checks against it.
    {
        let db = state.db.clone();
        let (sub, nickname) = (claims.sub, claims.nickname.clone());
        match tokio::task::spawn_blocking(move || db.upsert_user(sub, &nickname)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to provision user {}: {}", claims.sub, e),
            Err(e) => warn!("spawn_blocking join error: {}", e),
        }
    }

    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, db, claims.sub, claims.nickname)
    }))
}
