use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tackboard_db::StoreError;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Translates store errors into caller-facing responses with stable,
/// machine-checkable kinds.
pub struct ApiError(pub StoreError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Permission(_) => StatusCode::FORBIDDEN,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Storage(_) => {
                error!("storage failure: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}
