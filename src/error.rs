use thiserror::Error;

/// Errors raised while talking to the inference backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response decoded but lacks required fields. Names are sorted.
    #[error("Missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid mime type: {0}")]
    InvalidMime(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
