use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::{Result, StoreError};
use crate::index::FrameIndex;
use crate::render::SnapshotRenderer;

const DB_FILE: &str = "heatmaps.db";
const FRAMES_DIR: &str = "frames";

/// Default base directory for all heatmap storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".heatmap-engine")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// On-disk layout of one engine instance.
///
/// ```text
/// <base>/
/// ├── heatmaps.db
/// └── frames/
///     └── YYYY-MM-DD/heatmap_<type>_<ts>.png
/// ```
#[derive(Debug, Clone)]
pub struct DataDir {
    base: PathBuf,
}

impl DataDir {
    /// Resolve and create the layout. `base_dir` overrides the default
    /// `~/.heatmap-engine`.
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let frames = base.join(FRAMES_DIR);
        fs::create_dir_all(&frames).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", frames.display()))
        })?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn db_path(&self) -> PathBuf {
        self.base.join(DB_FILE)
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.base.join(FRAMES_DIR)
    }

    /// Open the writer connection to the frame index.
    pub fn open_index(&self) -> Result<FrameIndex> {
        FrameIndex::open(&self.db_path())
    }

    /// Open a read-only connection; each reader gets its own.
    pub fn open_reader(&self) -> Result<FrameIndex> {
        FrameIndex::open_reader(&self.db_path())
    }

    pub fn renderer(&self, pixel_scale: u32) -> SnapshotRenderer {
        SnapshotRenderer::new(self.frames_dir(), pixel_scale)
    }
}
