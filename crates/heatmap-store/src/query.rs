//! Read surface used by the HTTP layer and the CLI.

use std::fs;
use std::io::ErrorKind;

use heatmap_core::{DurationSelector, Frame, FrameRef, FrameType};

use crate::error::Result;
use crate::index::FrameIndex;

/// Outcome of an exact frame fetch. Each absent case is a distinct,
/// non-error result.
#[derive(Debug, PartialEq, Eq)]
pub enum ExactFetch {
    Found { frame: Frame, bytes: Vec<u8> },
    /// No index entry for this `(frame_type, timestamp)`.
    NotIndexed,
    /// Indexed, but the image is gone from disk.
    FileMissing(Frame),
}

impl FrameIndex {
    pub fn fetch_exact(&self, frame_type: FrameType, captured_at: i64) -> Result<ExactFetch> {
        let Some(frame) = self.exact_lookup(frame_type, captured_at)? else {
            return Ok(ExactFetch::NotIndexed);
        };

        match fs::read(&frame.file_path) {
            Ok(bytes) => Ok(ExactFetch::Found { frame, bytes }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    "{frame_type} frame at {captured_at} is indexed but missing on disk: {}",
                    frame.file_path.display()
                );
                Ok(ExactFetch::FileMissing(frame))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Frames from `[now - duration, now]`, oldest first.
    pub fn frames_for_duration(
        &self,
        duration: DurationSelector,
        frame_type: FrameType,
        now: i64,
    ) -> Result<Vec<FrameRef>> {
        let (start, end) = duration.bounds_ending_at(now);
        let frames = self.range_query(frame_type, start, end)?;
        Ok(frames.iter().map(FrameRef::from).collect())
    }
}

/// Per-type history summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_type: FrameType,
    pub count: u64,
    pub latest: Option<i64>,
}

impl FrameIndex {
    pub fn stats(&self) -> Result<Vec<FrameStats>> {
        FrameType::ALL
            .into_iter()
            .map(|frame_type| {
                Ok(FrameStats {
                    frame_type,
                    count: self.count(frame_type)?,
                    latest: self.latest(frame_type)?.map(|f| f.captured_at),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const NOW: i64 = 1_771_675_200;

    #[test]
    fn test_fetch_exact_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.png");
        fs::write(&path, b"png-bytes").unwrap();

        let index = FrameIndex::open_in_memory().unwrap();
        let frame = Frame {
            file_path: path,
            captured_at: NOW,
            frame_type: FrameType::Rolling,
        };
        index.append(&frame).unwrap();

        match index.fetch_exact(FrameType::Rolling, NOW).unwrap() {
            ExactFetch::Found { frame: f, bytes } => {
                assert_eq!(f, frame);
                assert_eq!(bytes, b"png-bytes");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_exact_not_indexed() {
        let index = FrameIndex::open_in_memory().unwrap();
        assert_eq!(
            index.fetch_exact(FrameType::Rolling, NOW).unwrap(),
            ExactFetch::NotIndexed
        );
    }

    #[test]
    fn test_fetch_exact_file_missing() {
        let index = FrameIndex::open_in_memory().unwrap();
        let frame = Frame {
            file_path: PathBuf::from("/nonexistent/heatmap_rolling_1.png"),
            captured_at: NOW,
            frame_type: FrameType::Rolling,
        };
        index.append(&frame).unwrap();

        assert_eq!(
            index.fetch_exact(FrameType::Rolling, NOW).unwrap(),
            ExactFetch::FileMissing(frame)
        );
    }

    #[test]
    fn test_frames_for_duration_window() {
        let index = FrameIndex::open_in_memory().unwrap();
        // one frame every 2 minutes over the last 2 hours
        for i in 0..=60 {
            let at = NOW - i * 120;
            index
                .append(&Frame {
                    file_path: PathBuf::from(format!("/f/{at}.png")),
                    captured_at: at,
                    frame_type: FrameType::ResetHour,
                })
                .unwrap();
        }

        let refs = index
            .frames_for_duration(DurationSelector::Past30Minutes, FrameType::ResetHour, NOW)
            .unwrap();
        // NOW - 1800 .. NOW inclusive at 120s spacing → 16 frames
        assert_eq!(refs.len(), 16);
        assert_eq!(refs.first().unwrap().timestamp, NOW - 1800);
        assert_eq!(refs.last().unwrap().timestamp, NOW);
        assert!(refs.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(refs.last().unwrap().path, format!("/f/{NOW}.png"));

        let other = index
            .frames_for_duration(DurationSelector::Past24Hours, FrameType::Rolling, NOW)
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_stats() {
        let index = FrameIndex::open_in_memory().unwrap();
        for at in [10, 20] {
            index
                .append(&Frame {
                    file_path: PathBuf::from(format!("/f/{at}.png")),
                    captured_at: at,
                    frame_type: FrameType::Reset30Min,
                })
                .unwrap();
        }

        let stats = index.stats().unwrap();
        assert_eq!(stats.len(), 3);
        let reset = stats.iter().find(|s| s.frame_type == FrameType::Reset30Min).unwrap();
        assert_eq!(reset.count, 2);
        assert_eq!(reset.latest, Some(20));
        let rolling = stats.iter().find(|s| s.frame_type == FrameType::Rolling).unwrap();
        assert_eq!(rolling.count, 0);
        assert_eq!(rolling.latest, None);
    }
}
