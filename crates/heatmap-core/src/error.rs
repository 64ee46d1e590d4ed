use std::fmt;

/// Configuration-class failures: rejected at the boundary, never mid-tick.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    UnknownFrameType(String),
    UnknownDuration(String),
    InvalidBounds(String),
    InvalidPolicy(String),
    InvalidGrid(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnknownFrameType(s) => write!(
                f,
                "unknown frame type '{s}' (expected rolling, reset_30min or reset_hour)"
            ),
            CoreError::UnknownDuration(s) => write!(
                f,
                "unknown duration '{s}' (expected 30, 60, 360 or 1440 minutes)"
            ),
            CoreError::InvalidBounds(msg) => write!(f, "invalid bounds: {msg}"),
            CoreError::InvalidPolicy(msg) => write!(f, "invalid window policy: {msg}"),
            CoreError::InvalidGrid(msg) => write!(f, "invalid grid: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
