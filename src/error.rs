use std::fmt;

/// Repository error taxonomy. Validation and NotFound describe the caller's
/// request; Storage wraps anything the database itself failed on.
#[derive(Debug)]
pub enum StoreError {
    Validation(String),
    NotFound(String),
    Storage(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(msg) => write!(f, "Validation error: {}", msg),
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Storage(other),
        }
    }
}

impl From<crate::transform::TransformError> for StoreError {
    fn from(e: crate::transform::TransformError) -> Self {
        StoreError::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Validation(format!("invalid JSON payload: {}", e))
    }
}
