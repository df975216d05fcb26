use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use tackboard_types::api::Claims;

use crate::state::AppState;

/// Extract and validate the bearer token from the Authorization header,
/// then make sure the identity it names exists locally. Token issuance is
/// the auth service's business; we only check signatures.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let claims = token_data.claims;

    // Materialize the identity so membership checks and nickname joins have
    // a row to land on. Idempotent, and a failure here only logs — the
    // request itself is already authenticated.
    {
        let db = state.db.clone();
        let (sub, nickname) = (claims.sub, claims.nickname.clone());
        let result =
            tokio::task::spawn_blocking(move || db.upsert_user(sub, &nickname)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to provision user {}: {}", claims.sub, e),
            Err(e) => warn!("spawn_blocking join error: {}", e),
        }
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
