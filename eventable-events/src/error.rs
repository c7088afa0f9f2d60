// Error types for the fallible edges of the event hub

use thiserror::Error;

/// Typed option lookup errors
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Option not found: {0}")]
    KeyNotFound(String),

    #[error("Option '{key}' has an unexpected type: {message}")]
    InvalidType { key: String, message: String },
}

/// Deferred dispatch scheduling errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Scheduler is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, OptionsError>;
