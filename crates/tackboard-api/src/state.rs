use std::sync::Arc;

use tackboard_db::{Database, StoreError};
use tackboard_gateway::dispatcher::Dispatcher;
use tracing::error;

use crate::blobs::BlobStore;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs, injected at startup — no ambient globals.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub blobs: Arc<dyn BlobStore>,
}

/// Run a blocking store call off the async runtime. Mutations commit in
/// here; callers broadcast only after this returns Ok.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError(StoreError::Storage(e.to_string()))
        })?
        .map_err(ApiError)
}
