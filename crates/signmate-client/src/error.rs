use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Missing, expired or rejected bearer credential (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network failure, timeout, or an unexpected HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The backend answered but the body was not what we expected
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
