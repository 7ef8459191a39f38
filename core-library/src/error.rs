//! Catalog errors
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog migration failed: {0}")]
    Migration(String),

    /// A user-facing lookup or flag flip named a row that is absent or soft-deleted
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Lyrics could not be encoded for storage
    #[error("Lyrics encoding failed: {0}")]
    Lyrics(#[from] serde_json::Error),
}

impl LibraryError {
    pub(crate) fn not_found(entity_type: &str, id: impl Into<String>) -> Self {
        LibraryError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }

    /// True when a statement names a column the current schema lacks.
    pub fn is_missing_column(&self) -> bool {
        match self {
            LibraryError::Database(e) => {
                let message = e.to_string();
                message.contains("no such column") || message.contains("has no column named")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
