//! Runtime configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A setting is missing, out of range, or logging was set up twice
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host injected no implementation and no platform default exists
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

impl Error {
    pub fn capability_missing(capability: &str, message: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
