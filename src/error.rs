use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Amount out of range: {0}")]
    InvalidAmount(String),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Stored row is malformed: {0}")]
    CorruptRow(String),

    #[error("Database schema version {db_version} is newer than supported version {latest_supported}")]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },

    #[error("Invalid schedule '{expr}': {reason}")]
    Schedule { expr: String, reason: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("GraphQL error: {0}")]
    GraphQL(String),

    #[error("Remote endpoint returned status {0}")]
    Status(u16),
}

pub type Result<T> = std::result::Result<T, CrmError>;
