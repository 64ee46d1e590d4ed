use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The windows tracked over the observation stream. Each names a frame series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Rolling-decay window: contributions expire individually.
    Rolling,
    /// Fixed-interval window reset every 30 minutes.
    #[serde(rename = "reset_30min")]
    Reset30Min,
    /// Fixed-interval window reset every hour.
    ResetHour,
}

impl FrameType {
    pub const ALL: [FrameType; 3] = [FrameType::Rolling, FrameType::Reset30Min, FrameType::ResetHour];

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Rolling => "rolling",
            FrameType::Reset30Min => "reset_30min",
            FrameType::ResetHour => "reset_hour",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rolling" => Ok(FrameType::Rolling),
            "reset_30min" => Ok(FrameType::Reset30Min),
            "reset_hour" => Ok(FrameType::ResetHour),
            other => Err(CoreError::UnknownFrameType(other.to_string())),
        }
    }
}

/// A rendered, persisted snapshot. Immutable once written;
/// `(frame_type, captured_at)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub file_path: PathBuf,
    pub captured_at: i64,
    pub frame_type: FrameType,
}

/// The `(path, timestamp)` pair handed to playback clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub path: String,
    pub timestamp: i64,
}

impl From<&Frame> for FrameRef {
    fn from(frame: &Frame) -> Self {
        Self {
            path: frame.file_path.to_string_lossy().into_owned(),
            timestamp: frame.captured_at,
        }
    }
}

/// Relative playback spans a client may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DurationSelector {
    Past30Minutes,
    PastHour,
    Past6Hours,
    Past24Hours,
}

impl DurationSelector {
    pub const ALL: [DurationSelector; 4] = [
        DurationSelector::Past30Minutes,
        DurationSelector::PastHour,
        DurationSelector::Past6Hours,
        DurationSelector::Past24Hours,
    ];

    pub fn minutes(&self) -> i64 {
        match self {
            DurationSelector::Past30Minutes => 30,
            DurationSelector::PastHour => 60,
            DurationSelector::Past6Hours => 360,
            DurationSelector::Past24Hours => 1440,
        }
    }

    pub fn secs(&self) -> i64 {
        self.minutes() * 60
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|d| d.minutes() == minutes)
            .ok_or_else(|| CoreError::UnknownDuration(minutes.to_string()))
    }

    /// Absolute `[now - span, now]` bounds, inclusive.
    pub fn bounds_ending_at(&self, now: i64) -> (i64, i64) {
        (now - self.secs(), now)
    }
}

impl FromStr for DurationSelector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes: i64 = s
            .trim()
            .parse()
            .map_err(|_| CoreError::UnknownDuration(s.to_string()))?;
        Self::from_minutes(minutes).map_err(|_| CoreError::UnknownDuration(s.to_string()))
    }
}
