use thiserror::Error;

/// Domain error taxonomy. Every store operation maps onto one of these
/// kinds, and the API layer translates kinds to stable caller-facing
/// responses.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed or missing input; nothing was written.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced entity does not exist, or the caller cannot see it.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The entity exists but the caller lacks the required relationship.
    #[error("permission denied: requires {0}")]
    Permission(&'static str),

    /// The request duplicates existing state (already invited, already a
    /// member).
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Transaction aborted or driver failure; never partially applied, the
    /// caller may retry.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// Machine-checkable kind string, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Permission(_) => "permission",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
