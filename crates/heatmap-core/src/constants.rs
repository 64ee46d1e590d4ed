/// Northern edge of the default tracked area (contiguous United States).
pub const DEFAULT_NORTH: f64 = 49.0;

/// Southern edge of the default tracked area.
pub const DEFAULT_SOUTH: f64 = 24.0;

/// Western edge of the default tracked area.
pub const DEFAULT_WEST: f64 = -125.0;

/// Eastern edge of the default tracked area.
pub const DEFAULT_EAST: f64 = -60.0;

/// Grid cells per side.
pub const DEFAULT_RESOLUTION: usize = 200;

/// Largest accepted grid resolution (cells per side).
pub const MAX_RESOLUTION: usize = 4096;

/// Largest rendered image edge, in pixels.
pub const MAX_IMAGE_SIDE: usize = 16_384;

/// Seconds between scheduler ticks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

/// Count at which the color ramp saturates.
pub const DEFAULT_CEILING: u32 = 10;

/// Rolling window length and the short reset period (30 minutes).
pub const HALF_HOUR_SECS: i64 = 30 * 60;

/// Long reset period (1 hour).
pub const HOUR_SECS: i64 = 60 * 60;

/// Output pixels per grid cell edge.
pub const DEFAULT_PIXEL_SCALE: u32 = 4;
