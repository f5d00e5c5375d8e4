//! Error types for fatum

use thiserror::Error;

/// Main error type for fatum operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid radius: {0}")]
    InvalidRadius(String),

    #[error("Invalid entropy source: {0}")]
    InvalidSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile store error: {0}")]
    Store(String),

    #[error("No API token configured")]
    MissingCredential,

    #[error("API request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("API transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for fatum operations
pub type Result<T> = std::result::Result<T, Error>;
