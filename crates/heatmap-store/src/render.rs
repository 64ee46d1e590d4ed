//! Snapshot rendering: density grid → PNG under a per-day partition.
//!
//! Rendering never touches the frame index. The caller decides whether to
//! append the returned [`Frame`], so tests can render without persisting.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use heatmap_core::{DensityGrid, Frame, FrameType, WindowAccumulator, grid_to_rgba};

use crate::error::{Result, StoreError};

pub struct SnapshotRenderer {
    frames_dir: PathBuf,
    pixel_scale: u32,
}

impl SnapshotRenderer {
    pub fn new(frames_dir: impl Into<PathBuf>, pixel_scale: u32) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            pixel_scale: pixel_scale.max(1),
        }
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Render the accumulator's current snapshot using its own ceiling.
    pub fn render_accumulator(&self, acc: &WindowAccumulator, at: i64) -> Result<Frame> {
        self.render(&acc.snapshot(), acc.frame_type(), at, acc.ceiling())
    }

    /// Write `grid` as `<frames_dir>/<local date>/heatmap_<type>_<at>.png`.
    ///
    /// The image is written to a hidden temp file and renamed into place, so
    /// a reader that finds the path never sees a truncated PNG. An existing
    /// file at the target path is never overwritten.
    pub fn render(
        &self,
        grid: &DensityGrid,
        frame_type: FrameType,
        at: i64,
        ceiling: u32,
    ) -> Result<Frame> {
        let day_dir = self.frames_dir.join(partition_key(at)?);
        fs::create_dir_all(&day_dir)?;

        let file_name = format!("heatmap_{frame_type}_{at}.png");
        let file_path = day_dir.join(&file_name);
        if file_path.exists() {
            return Err(StoreError::DuplicateKey {
                frame_type,
                captured_at: at,
            });
        }

        let (width, height, pixels) = grid_to_rgba(grid, ceiling, self.pixel_scale)?;
        let tmp_path = day_dir.join(format!(".{file_name}.tmp"));
        if let Err(e) = write_png(&tmp_path, width, height, &pixels) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        fs::rename(&tmp_path, &file_path)?;

        tracing::debug!(
            "rendered {frame_type} frame at {at}: sum={}, max={} → {}",
            grid.sum(),
            grid.max(),
            file_path.display()
        );

        Ok(Frame {
            file_path,
            captured_at: at,
            frame_type,
        })
    }
}

/// Local calendar date of `at`, formatted `YYYY-MM-DD`.
pub fn partition_key(at: i64) -> Result<String> {
    let local = Local
        .timestamp_opt(at, 0)
        .earliest()
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp out of range: {at}")))?;
    Ok(local.format("%Y-%m-%d").to_string())
}

fn write_png(path: &Path, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new(file);
    encoder.write_image(pixels, width, height, image::ExtendedColorType::Rgba8)?;
    Ok(())
}
