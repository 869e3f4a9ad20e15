use thiserror::Error;

/// The error kinds named in the Dispatcher's error handling design.
///
/// RPC handlers never let these escape as transport faults: they are caught
/// at the handler boundary and turned into a `(success=false, message)` pair
/// or a streaming error frame. Only genuinely unexpected failures surface as
/// [`OsintError::Internal`].
#[derive(Debug, Error)]
pub enum OsintError {
    #[error("authentication failed: {0}")]
    AuthError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OsintError {
    /// Human-readable message suitable for the `message` field of a
    /// `(success, message)` RPC response. Never leaks internal detail for
    /// auth failures, to avoid account enumeration.
    pub fn public_message(&self) -> String {
        match self {
            OsintError::AuthError(_) => "invalid credentials or token".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for OsintError {
    fn from(e: serde_json::Error) -> Self {
        OsintError::Internal(format!("serialization error: {e}"))
    }
}
