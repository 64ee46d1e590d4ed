//! Fixed-cadence poller driving the window accumulators.
//!
//! One scheduler task is the sole writer of every grid and of the frame
//! index. Each tick fetches, observes, ticks every window, then renders and
//! appends one frame per window. No failure inside a tick escapes it: the
//! loop only ends when its [`Ticker`] says so.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use heatmap_core::{Binner, WindowAccumulator, ingest, now_unix_secs};
use heatmap_store::{FrameIndex, SnapshotRenderer, StoreError};

use crate::source::ObservationSource;

/// Source of tick instants. `None` stops the scheduler.
pub trait Ticker {
    fn next(&mut self) -> impl Future<Output = Option<i64>> + Send;
}

/// Wall-clock ticker: fires immediately, then every `period`, until cancelled.
pub struct IntervalTicker {
    interval: Interval,
    cancel: CancellationToken,
}

impl IntervalTicker {
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        let mut interval = tokio::time::interval(period);
        // A slow render delays the next poll; it must not trigger a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, cancel }
    }
}

impl Ticker for IntervalTicker {
    fn next(&mut self) -> impl Future<Output = Option<i64>> + Send {
        async move {
            tokio::select! {
                _ = self.cancel.cancelled() => None,
                _ = self.interval.tick() => Some(now_unix_secs()),
            }
        }
    }
}

/// Replays a fixed list of instants. Used to drive the scheduler without
/// real delays.
pub struct ScriptedTicker {
    instants: VecDeque<i64>,
}

impl ScriptedTicker {
    pub fn new(instants: impl IntoIterator<Item = i64>) -> Self {
        Self {
            instants: instants.into_iter().collect(),
        }
    }
}

impl Ticker for ScriptedTicker {
    fn next(&mut self) -> impl Future<Output = Option<i64>> + Send {
        let next = self.instants.pop_front();
        async move { next }
    }
}

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub at: i64,
    pub fetch_failed: bool,
    pub fetched: usize,
    pub binned: usize,
    pub dropped: usize,
    pub evicted: usize,
    pub resets: usize,
    pub frames_written: usize,
    pub failures: usize,
}

pub struct Scheduler<S> {
    source: S,
    binner: Binner,
    windows: Vec<WindowAccumulator>,
    renderer: SnapshotRenderer,
    index: FrameIndex,
}

impl<S: ObservationSource> Scheduler<S> {
    pub fn new(
        source: S,
        binner: Binner,
        windows: Vec<WindowAccumulator>,
        renderer: SnapshotRenderer,
        index: FrameIndex,
    ) -> Self {
        Self {
            source,
            binner,
            windows,
            renderer,
            index,
        }
    }

    pub fn windows(&self) -> &[WindowAccumulator] {
        &self.windows
    }

    pub fn index(&self) -> &FrameIndex {
        &self.index
    }

    /// Run ticks until the ticker stops. Returns the number of ticks run.
    pub async fn run<T: Ticker>(&mut self, ticker: &mut T) -> usize {
        let mut ticks = 0;
        while let Some(now) = ticker.next().await {
            let summary = self.tick(now).await;
            ticks += 1;
            tracing::info!(
                "tick {now}: fetched={} binned={} dropped={} evicted={} resets={} frames={} failures={}",
                summary.fetched,
                summary.binned,
                summary.dropped,
                summary.evicted,
                summary.resets,
                summary.frames_written,
                summary.failures,
            );
        }
        tracing::info!("scheduler stopped after {ticks} ticks");
        ticks
    }

    /// One full poll → observe → tick → render → append cycle at `now`.
    pub async fn tick(&mut self, now: i64) -> TickSummary {
        let mut summary = TickSummary {
            at: now,
            ..TickSummary::default()
        };

        let observations = match self.source.fetch(self.binner.bounds(), now).await {
            Ok(obs) => obs,
            Err(e) => {
                tracing::warn!("observation fetch failed, rendering unchanged grids: {e}");
                summary.fetch_failed = true;
                Vec::new()
            }
        };
        summary.fetched = observations.len();

        let ingested = ingest(&self.binner, &observations, &mut self.windows);
        summary.binned = ingested.binned;
        summary.dropped = ingested.dropped;

        // Eviction before rendering, so a just-reset window renders empty.
        for window in self.windows.iter_mut() {
            let report = window.tick(now);
            summary.evicted += report.evicted;
            if report.reset {
                summary.resets += 1;
                tracing::debug!(
                    "{} window reset ({} boundaries crossed)",
                    window.frame_type(),
                    report.boundaries_crossed
                );
            }
            if report.underflows > 0 {
                summary.failures += 1;
                tracing::error!(
                    "{} window: {} evictions hit an already-empty cell (clamped to 0)",
                    window.frame_type(),
                    report.underflows
                );
            }
        }

        for window in &self.windows {
            let frame = match self.renderer.render_accumulator(window, now) {
                Ok(frame) => frame,
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!("failed to render {} frame at {now}: {e}", window.frame_type());
                    continue;
                }
            };
            match self.index.append(&frame) {
                Ok(()) => summary.frames_written += 1,
                Err(e @ StoreError::DuplicateKey { .. }) => {
                    summary.failures += 1;
                    tracing::error!("{e}");
                }
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!("failed to index {} frame at {now}: {e}", window.frame_type());
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use heatmap_core::{Bounds, FrameType, HALF_HOUR_SECS, HOUR_SECS, Observation};
    use heatmap_store::DataDir;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // 2026-02-21T12:00:00Z, a clean hour boundary
    const T0: i64 = 1_771_675_200;
    const RES: usize = 20;

    /// Serves a queued batch per fetch; an empty queue means an empty sky.
    struct StubSource {
        batches: Mutex<VecDeque<Result<Vec<(f64, f64)>, ()>>>,
    }

    impl StubSource {
        fn new(batches: Vec<Result<Vec<(f64, f64)>, ()>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
            }
        }
    }

    impl ObservationSource for StubSource {
        fn fetch(
            &self,
            _bounds: &Bounds,
            now: i64,
        ) -> impl Future<Output = Result<Vec<Observation>, SourceError>> + Send {
            let next = self.batches.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
            async move {
                match next {
                    Ok(points) => Ok(points
                        .into_iter()
                        .map(|(lat, lon)| Observation::new(lat, lon, now))
                        .collect()),
                    Err(()) => Err(SourceError::Status(503)),
                }
            }
        }
    }

    fn scheduler(dir: &TempDir, source: StubSource) -> Scheduler<StubSource> {
        let data = DataDir::open(Some(dir.path())).unwrap();
        let windows = vec![
            WindowAccumulator::rolling_decay(FrameType::Rolling, HALF_HOUR_SECS, RES, 10).unwrap(),
            WindowAccumulator::fixed_interval(FrameType::Reset30Min, HALF_HOUR_SECS, RES, 10)
                .unwrap(),
            WindowAccumulator::fixed_interval(FrameType::ResetHour, HOUR_SECS, RES, 10).unwrap(),
        ];
        Scheduler::new(
            source,
            Binner::new(Bounds::default(), RES).unwrap(),
            windows,
            data.renderer(1),
            data.open_index().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_tick_renders_every_window() {
        let dir = TempDir::new().unwrap();
        let mut s = scheduler(&dir, StubSource::new(vec![Ok(vec![(40.0, -100.0), (70.0, 0.0)])]));

        let summary = s.tick(T0).await;
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.binned, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.failures, 0);

        for ft in FrameType::ALL {
            let frame = s.index().exact_lookup(ft, T0).unwrap().unwrap();
            assert!(frame.file_path.exists());
        }
        assert!(s.windows().iter().all(|w| w.sum() == 1));
    }

    #[tokio::test]
    async fn test_empty_tick_still_renders_zero_frames() {
        let dir = TempDir::new().unwrap();
        let mut s = scheduler(&dir, StubSource::new(vec![]));

        let summary = s.tick(T0).await;
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.frames_written, 3);
        assert!(s.windows().iter().all(|w| w.sum() == 0));

        let later = s.tick(T0 + 120).await;
        assert_eq!(later.frames_written, 3);
        assert_eq!(s.index().count(FrameType::Rolling).unwrap(), 2);
        assert!(s.index().exact_lookup(FrameType::Rolling, T0 + 120).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_abort_tick() {
        let dir = TempDir::new().unwrap();
        let mut s = scheduler(
            &dir,
            StubSource::new(vec![Ok(vec![(40.0, -100.0)]), Err(())]),
        );

        s.tick(T0).await;
        let summary = s.tick(T0 + 120).await;
        assert!(summary.fetch_failed);
        assert_eq!(summary.frames_written, 3);
        // Unchanged grids still rendered
        assert!(s.windows().iter().all(|w| w.sum() == 1));
    }

    #[tokio::test]
    async fn test_same_second_twice_surfaces_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut s = scheduler(&dir, StubSource::new(vec![]));

        assert_eq!(s.tick(T0).await.frames_written, 3);
        let again = s.tick(T0).await;
        assert_eq!(again.frames_written, 0);
        assert_eq!(again.failures, 3);
        assert_eq!(s.index().count(FrameType::Rolling).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_with_scripted_ticks() {
        let dir = TempDir::new().unwrap();
        let sky = vec![(40.0, -100.0), (35.0, -90.0)];
        let mut s = scheduler(&dir, StubSource::new(vec![Ok(sky.clone()); 20]));

        // Every 2 minutes for 36 minutes, crossing the 30-minute boundary
        let instants: Vec<i64> = (0..=18).map(|i| T0 + i * 120).collect();
        let mut ticker = ScriptedTicker::new(instants.clone());
        let ticks = s.run(&mut ticker).await;
        assert_eq!(ticks, instants.len());

        let windows = s.windows();
        // rolling: ticks at T0+360..=T0+2160 are still inside the window (16 ticks × 2)
        assert_eq!(windows[0].sum(), 32);
        // 30-min window reset during the T0+1800 tick, wiping that tick's
        // observations; ticks at 1920..=2160 remain (3 ticks × 2)
        assert_eq!(windows[1].sum(), 6);
        // hourly window never reset
        assert_eq!(windows[2].sum(), 38);

        let frames = s.index().range_query(FrameType::Reset30Min, T0, T0 + 3600).unwrap();
        assert_eq!(frames.len(), instants.len());
    }

    #[tokio::test]
    async fn test_interval_ticker_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let mut ticker = IntervalTicker::new(Duration::from_secs(3600), cancel.clone());

        // First tick fires immediately
        assert!(ticker.next().await.is_some());
        cancel.cancel();
        assert_eq!(ticker.next().await, None);
    }
}
