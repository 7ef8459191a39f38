//! Tag reading and artwork cache errors
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// The audio file exists but its container or tags could not be parsed
    #[error("Tag extraction failed: {0}")]
    ExtractionFailed(String),

    /// The uri points at something the reader cannot open, e.g. a remote scheme
    #[error("Unsupported source: {0}")]
    UnsupportedFormat(String),

    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid artwork: {0}")]
    InvalidArtwork(String),

    #[error(transparent)]
    Library(#[from] core_library::LibraryError),

    #[error(transparent)]
    Host(#[from] bridge_traits::error::BridgeError),
}

impl MetadataError {
    /// Failures that only mean "fall back to the file name"
    pub fn is_unreadable_source(&self) -> bool {
        matches!(
            self,
            MetadataError::ExtractionFailed(_)
                | MetadataError::UnsupportedFormat(_)
                | MetadataError::FileNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
