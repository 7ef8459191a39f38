//! Façade errors
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The catalog location could not be prepared
    #[error("Catalog storage unavailable at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: bridge_traits::error::BridgeError,
    },

    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),

    #[error(transparent)]
    Library(#[from] core_library::LibraryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
