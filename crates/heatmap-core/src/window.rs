//! Window accumulators: one density grid per aggregation window.
//!
//! Every accumulator consumes the same observation stream but applies its own
//! eviction policy:
//!
//! - `RollingDecay` remembers when each contribution arrived and removes it
//!   individually once it ages out of the window.
//! - `FixedInterval` keeps everything until an epoch-aligned period boundary
//!   is crossed, then zeroes the whole grid once.
//!
//! Accumulators are single-writer and perform no I/O. Consistency problems
//! (a decrement that would go negative) are counted in the [`TickReport`]
//! and left to the caller to log.

use std::collections::VecDeque;

use crate::bounds::GridCell;
use crate::error::{CoreError, Result};
use crate::frame::FrameType;
use crate::grid::{DensityGrid, check_resolution};
use crate::time::period_index;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowPolicy {
    RollingDecay { window_secs: i64 },
    FixedInterval { period_secs: i64 },
}

impl WindowPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            WindowPolicy::RollingDecay { window_secs } if window_secs <= 0 => Err(
                CoreError::InvalidPolicy(format!("rolling window must be positive, got {window_secs}s")),
            ),
            WindowPolicy::FixedInterval { period_secs } if period_secs <= 0 => Err(
                CoreError::InvalidPolicy(format!("reset period must be positive, got {period_secs}s")),
            ),
            _ => Ok(()),
        }
    }
}

/// One live contribution to a rolling window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub observed_at: i64,
    pub cell: GridCell,
}

/// What a single `tick` did to the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// History entries removed (rolling windows only).
    pub evicted: usize,
    /// Evictions whose cell was already zero.
    pub underflows: usize,
    /// Whether the grid was zeroed (fixed-interval windows only).
    pub reset: bool,
    /// Period boundaries passed since the previous tick.
    pub boundaries_crossed: i64,
}

pub struct WindowAccumulator {
    frame_type: FrameType,
    policy: WindowPolicy,
    ceiling: u32,
    grid: DensityGrid,
    history: VecDeque<HistoryEntry>,
    last_boundary: Option<i64>,
}

impl WindowAccumulator {
    pub fn new(
        frame_type: FrameType,
        policy: WindowPolicy,
        resolution: usize,
        ceiling: u32,
    ) -> Result<Self> {
        policy.validate()?;
        check_resolution(resolution)?;
        if ceiling == 0 {
            return Err(CoreError::InvalidPolicy("ceiling must be at least 1".to_string()));
        }
        Ok(Self {
            frame_type,
            policy,
            ceiling,
            grid: DensityGrid::new(resolution),
            history: VecDeque::new(),
            last_boundary: None,
        })
    }

    pub fn rolling_decay(
        frame_type: FrameType,
        window_secs: i64,
        resolution: usize,
        ceiling: u32,
    ) -> Result<Self> {
        Self::new(frame_type, WindowPolicy::RollingDecay { window_secs }, resolution, ceiling)
    }

    pub fn fixed_interval(
        frame_type: FrameType,
        period_secs: i64,
        resolution: usize,
        ceiling: u32,
    ) -> Result<Self> {
        Self::new(frame_type, WindowPolicy::FixedInterval { period_secs }, resolution, ceiling)
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn sum(&self) -> u64 {
        self.grid.sum()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_boundary(&self) -> Option<i64> {
        self.last_boundary
    }

    /// Record one binned observation. Returns false if the cell does not fit
    /// this grid's resolution (nothing is recorded).
    pub fn observe(&mut self, cell: GridCell, at: i64) -> bool {
        if !self.grid.increment(cell) {
            return false;
        }
        match self.policy {
            WindowPolicy::RollingDecay { .. } => {
                self.history.push_back(HistoryEntry {
                    observed_at: at,
                    cell,
                });
            }
            WindowPolicy::FixedInterval { period_secs } => {
                self.last_boundary
                    .get_or_insert_with(|| period_index(at, period_secs));
            }
        }
        true
    }

    /// Apply the window's eviction policy as of `now`. Must run before
    /// `snapshot` so the published grid reflects only the live window.
    pub fn tick(&mut self, now: i64) -> TickReport {
        match self.policy {
            WindowPolicy::RollingDecay { window_secs } => self.evict_older_than(now - window_secs),
            WindowPolicy::FixedInterval { period_secs } => self.reset_on_boundary(now, period_secs),
        }
    }

    /// Owned copy of the current grid, decoupled from further mutation.
    pub fn snapshot(&self) -> DensityGrid {
        self.grid.clone()
    }

    fn evict_older_than(&mut self, cutoff: i64) -> TickReport {
        let mut report = TickReport::default();
        if !self.history.iter().any(|e| e.observed_at < cutoff) {
            return report;
        }

        let mut kept = VecDeque::with_capacity(self.history.len());
        for entry in self.history.drain(..) {
            if entry.observed_at < cutoff {
                report.evicted += 1;
                if !self.grid.decrement(entry.cell) {
                    report.underflows += 1;
                }
            } else {
                kept.push_back(entry);
            }
        }
        self.history = kept;
        report
    }

    fn reset_on_boundary(&mut self, now: i64, period_secs: i64) -> TickReport {
        let boundary = period_index(now, period_secs);
        let mut report = TickReport::default();
        match self.last_boundary {
            None => self.last_boundary = Some(boundary),
            Some(last) if boundary > last => {
                self.grid.clear();
                self.last_boundary = Some(boundary);
                report.reset = true;
                report.boundaries_crossed = boundary - last;
            }
            // Same period, or a clock that stepped backwards.
            Some(_) => {}
        }
        report
    }
}
