//! Error types for the notice sentinel service

/// Errors that can occur in the notice sentinel service
#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Error fetching data: {0}")]
    Fetch(String),

    #[error("Failed to send email: {0}")]
    Send(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for notice sentinel operations
pub type Result<T> = std::result::Result<T, NoticeError>;
