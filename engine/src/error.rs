//! Engine error type.

use shared::DateParseError;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("invalid date: {0}")]
    InvalidDate(#[from] DateParseError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("day {day} does not exist in {month}")]
    DayOutOfMonth { day: u32, month: String },
    #[error("price must be a non-negative integer, got {0}")]
    InvalidPrice(String),
    #[error("remote storage is not available in local mode")]
    RemoteUnavailable,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("nothing to save")]
    NothingToSave,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
