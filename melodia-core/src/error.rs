use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please review it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Music service errors
    #[error("Music API {endpoint} returned HTTP status {status}")]
    ApiStatus { endpoint: String, status: u16 },

    #[error("Music API {endpoint} returned code {code}")]
    ApiCode { endpoint: String, code: i64 },

    #[error("Unknown quality level: {0}")]
    UnknownQuality(String),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // Decoding errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // Persistence errors
    #[error("State storage error: {reason}")]
    StorageError { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Playback errors
    #[error("Media element error: {reason}")]
    MediaError { reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
