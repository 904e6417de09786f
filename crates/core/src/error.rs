use crate::types::DbId;

/// Domain error shared by every layer.
///
/// The API crate maps each variant onto an HTTP status code.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request is well-formed but conflicts with the current state
    /// (duplicate submission, illegal workflow transition).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for CoreError {
    /// Plain string errors from the validation helpers become `Validation`.
    fn from(msg: String) -> Self {
        CoreError::Validation(msg)
    }
}
