use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    /// A required input is missing or out of date (no document, no preview
    /// metrics, a sign already running, ...).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        SignError::InvalidState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
