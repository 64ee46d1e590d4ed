//! Heatmap aggregation engine.
//!
//! Bins positional observations onto a fixed-resolution grid and maintains
//! several time-windowed density grids over the same stream, each with its
//! own eviction policy (rolling decay or fixed-interval reset). Grids are
//! rasterised through a saturating color ramp for rendering.
//!
//! Zero I/O: persistence, rendering to disk and scheduling live in the
//! store and cli crates.

pub mod bounds;
pub mod constants;
pub mod error;
pub mod frame;
pub mod grid;
pub mod observation;
pub mod ramp;
pub mod time;
pub mod window;

pub use bounds::{Binner, Bounds, GridCell};
pub use constants::{
    DEFAULT_CEILING, DEFAULT_PIXEL_SCALE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RESOLUTION,
    HALF_HOUR_SECS, HOUR_SECS, MAX_IMAGE_SIDE, MAX_RESOLUTION,
};
pub use error::CoreError;
pub use frame::{DurationSelector, Frame, FrameRef, FrameType};
pub use grid::{DensityGrid, check_resolution};
pub use observation::{IngestReport, Observation, ingest};
pub use ramp::{grid_to_rgba, heat_color, image_side};
pub use time::{now_unix_secs, period_index, unix_to_iso8601};
pub use window::{HistoryEntry, TickReport, WindowAccumulator, WindowPolicy};
