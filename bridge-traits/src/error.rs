//! Errors surfaced by host capabilities
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The media store or file system refused the request
    #[error("Host denied access: {0}")]
    PermissionDenied(String),

    /// The capability ran but could not complete, e.g. a media store query failed
    #[error("Host operation failed: {0}")]
    OperationFailed(String),

    #[error("Host I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn is_permission_denied(&self) -> bool {
        match self {
            BridgeError::PermissionDenied(_) => true,
            BridgeError::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            BridgeError::OperationFailed(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
