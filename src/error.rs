use thiserror::Error;

/// Main error type for the activity server
#[derive(Error, Debug)]
pub enum ServerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Model errors
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Storage errors not originating from sqlx
    #[error("Storage error: {0}")]
    Storage(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ServerError
pub type Result<T> = std::result::Result<T, ServerError>;
