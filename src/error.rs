//! Error types for the alarm engine.

use thiserror::Error;

/// Result type for alarm engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected at construction; never reaches the evaluator.
    #[error("invalid alarm time {hour:02}:{minute:02} (hour must be 0-23, minute 0-59)")]
    InvalidAlarm { hour: u32, minute: u32 },

    /// The saved state file exists but cannot be parsed.
    #[error("saved state is corrupt: {0}")]
    CorruptState(#[from] toml::de::Error),

    /// The in-memory state could not be serialized.
    #[error("could not encode state: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Reading or writing the state file failed.
    #[error("storage error: {0}")]
    Persistence(#[from] std::io::Error),
}
