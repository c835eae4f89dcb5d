//! Error type shared by the store, importer and notification paths.

use thiserror::Error;

/// Everything that can go wrong while importing plans or sending notifications.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The plan payload is not valid JSON, not an array, or an item is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The webhook URL cell is blank.
    #[error("webhook URL is not configured (set it with `tracker webhook <URL>` or fill in {0})")]
    MissingConfiguration(String),

    /// The outbound send to the webhook failed.
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    /// The config file could not be parsed or holds an invalid value.
    #[error("config error: {0}")]
    Config(String),

    /// A sheet could not be read or written as requested.
    #[error("sheet error: {0}")]
    Sheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
