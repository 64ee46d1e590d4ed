use std::fmt;

use heatmap_core::{CoreError, FrameType};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Image(image::ImageError),
    /// A frame with this `(frame_type, captured_at)` is already indexed.
    DuplicateKey { frame_type: FrameType, captured_at: i64 },
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Image(e) => write!(f, "image encoding error: {e}"),
            StoreError::DuplicateKey {
                frame_type,
                captured_at,
            } => write!(
                f,
                "duplicate frame: {frame_type} at {captured_at} is already indexed"
            ),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

impl From<image::ImageError> for StoreError {
    fn from(e: image::ImageError) -> Self {
        StoreError::Image(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
