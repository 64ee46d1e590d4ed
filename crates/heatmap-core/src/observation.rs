use serde::{Deserialize, Serialize};

use crate::bounds::Binner;
use crate::window::WindowAccumulator;

/// One positional sample from the feed. Never persisted individually.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: i64,
}

impl Observation {
    pub fn new(latitude: f64, longitude: f64, observed_at: i64) -> Self {
        Self {
            latitude,
            longitude,
            observed_at,
        }
    }
}

/// Counts from feeding one batch of observations into the accumulators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub binned: usize,
    pub dropped: usize,
}

/// Bin every in-bounds observation and feed it to each accumulator.
/// Out-of-bounds samples are dropped silently.
pub fn ingest(
    binner: &Binner,
    observations: &[Observation],
    accumulators: &mut [WindowAccumulator],
) -> IngestReport {
    let mut report = IngestReport::default();
    for obs in observations {
        match binner.try_bin(obs.latitude, obs.longitude) {
            Some(cell) => {
                report.binned += 1;
                for acc in accumulators.iter_mut() {
                    acc.observe(cell, obs.observed_at);
                }
            }
            None => report.dropped += 1,
        }
    }
    report
}
