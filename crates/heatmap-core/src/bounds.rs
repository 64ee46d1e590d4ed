use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EAST, DEFAULT_NORTH, DEFAULT_RESOLUTION, DEFAULT_SOUTH, DEFAULT_WEST};
use crate::error::{CoreError, Result};
use crate::grid::check_resolution;

/// Geographic rectangle tracked by the engine, in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            north: DEFAULT_NORTH,
            south: DEFAULT_SOUTH,
            west: DEFAULT_WEST,
            east: DEFAULT_EAST,
        }
    }
}

impl Bounds {
    pub fn validate(&self) -> Result<()> {
        let all_finite = [self.north, self.south, self.west, self.east]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(CoreError::InvalidBounds("coordinates must be finite".to_string()));
        }
        if self.north <= self.south {
            return Err(CoreError::InvalidBounds(format!(
                "north ({}) must be greater than south ({})",
                self.north, self.south
            )));
        }
        if self.east <= self.west {
            return Err(CoreError::InvalidBounds(format!(
                "east ({}) must be greater than west ({})",
                self.east, self.west
            )));
        }
        Ok(())
    }

    /// Inclusive containment check.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.south <= lat && lat <= self.north && self.west <= lon && lon <= self.east
    }

    /// Feed query form: `north,south,west,east`.
    pub fn as_query(&self) -> String {
        format!("{},{},{},{}", self.north, self.south, self.west, self.east)
    }
}

/// One bin of the discretized area. Row 0 is the northern edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Maps coordinates to grid cells by linear interpolation over fixed bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binner {
    bounds: Bounds,
    resolution: usize,
}

impl Default for Binner {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl Binner {
    pub fn new(bounds: Bounds, resolution: usize) -> Result<Self> {
        bounds.validate()?;
        check_resolution(resolution)?;
        Ok(Self { bounds, resolution })
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.bounds.contains(lat, lon)
    }

    /// Bin an in-bounds sample. Callers must check `contains` first; values
    /// outside the bounds are clamped onto the edge cells.
    pub fn bin(&self, lat: f64, lon: f64) -> GridCell {
        let b = &self.bounds;
        let max = (self.resolution - 1) as f64;
        let row_frac = (b.north - lat) / (b.north - b.south);
        let col_frac = (lon - b.west) / (b.east - b.west);
        GridCell {
            row: (row_frac * max).floor().clamp(0.0, max) as usize,
            col: (col_frac * max).floor().clamp(0.0, max) as usize,
        }
    }

    /// `contains` + `bin`. Out-of-bounds samples yield `None`.
    pub fn try_bin(&self, lat: f64, lon: f64) -> Option<GridCell> {
        if self.contains(lat, lon) {
            Some(self.bin(lat, lon))
        } else {
            None
        }
    }
}
