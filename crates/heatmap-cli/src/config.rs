//! TOML configuration. Every field has a default, so an empty file (or no
//! file at all) runs the engine over the contiguous United States.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use heatmap_core::{
    Binner, Bounds, DEFAULT_CEILING, DEFAULT_PIXEL_SCALE, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RESOLUTION, FrameType, WindowAccumulator, WindowPolicy, image_side,
};

pub const DATA_DIR_ENV: &str = "HEATMAP_DATA_DIR";

pub const DEFAULT_FEED_URL: &str = "https://data-cloud.flightradar24.com/zones/fcgi/feed.js";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub listen: String,
    pub feed_url: String,
    pub bounds: Bounds,
    pub grid: GridConfig,
    pub windows: WindowsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub resolution: usize,
    pub pixel_scale: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowsConfig {
    /// Lifetime of each contribution to the rolling window.
    pub rolling_minutes: i64,
    pub short_reset_minutes: i64,
    pub long_reset_minutes: i64,
    /// Count at which the color ramp saturates.
    pub ceiling: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            listen: "0.0.0.0:5050".to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            bounds: Bounds::default(),
            grid: GridConfig::default(),
            windows: WindowsConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            pixel_scale: DEFAULT_PIXEL_SCALE,
        }
    }
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            rolling_minutes: 30,
            short_reset_minutes: 30,
            long_reset_minutes: 60,
            ceiling: DEFAULT_CEILING,
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise use defaults. Always validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::parse(&content)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse TOML")
    }

    /// Checks every value without allocating any grid.
    pub fn validate(&self) -> Result<()> {
        self.binner()?;
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.grid.pixel_scale == 0 {
            bail!("grid.pixel_scale must be at least 1");
        }
        image_side(self.grid.resolution, self.grid.pixel_scale)
            .map_err(|e| anyhow!("grid.pixel_scale: {e}"))?;
        for (_, policy) in self.window_policies()? {
            policy.validate().map_err(|e| anyhow!("{e}"))?;
        }
        if self.windows.ceiling == 0 {
            bail!("windows.ceiling must be at least 1");
        }
        Ok(())
    }

    /// Data directory precedence: explicit override, `HEATMAP_DATA_DIR`,
    /// the config file, then the store default.
    pub fn resolve_data_dir(&self, cli_override: Option<&Path>) -> Option<PathBuf> {
        cli_override
            .map(PathBuf::from)
            .or_else(|| std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from))
            .or_else(|| self.data_dir.clone())
    }

    pub fn binner(&self) -> Result<Binner> {
        Binner::new(self.bounds, self.grid.resolution).map_err(|e| anyhow!("{e}"))
    }

    /// Policy per tracked window, in `FrameType::ALL` order.
    pub fn window_policies(&self) -> Result<[(FrameType, WindowPolicy); 3]> {
        let w = &self.windows;
        Ok([
            (
                FrameType::Rolling,
                WindowPolicy::RollingDecay {
                    window_secs: minutes_to_secs("rolling_minutes", w.rolling_minutes)?,
                },
            ),
            (
                FrameType::Reset30Min,
                WindowPolicy::FixedInterval {
                    period_secs: minutes_to_secs("short_reset_minutes", w.short_reset_minutes)?,
                },
            ),
            (
                FrameType::ResetHour,
                WindowPolicy::FixedInterval {
                    period_secs: minutes_to_secs("long_reset_minutes", w.long_reset_minutes)?,
                },
            ),
        ])
    }

    /// One accumulator per tracked window, in `FrameType::ALL` order.
    pub fn build_windows(&self) -> Result<Vec<WindowAccumulator>> {
        self.window_policies()?
            .into_iter()
            .map(|(frame_type, policy)| {
                WindowAccumulator::new(frame_type, policy, self.grid.resolution, self.windows.ceiling)
                    .map_err(|e| anyhow!("{frame_type} window: {e}"))
            })
            .collect()
    }
}

fn minutes_to_secs(field: &str, minutes: i64) -> Result<i64> {
    match minutes.checked_mul(60) {
        Some(secs) => Ok(secs),
        None => bail!("windows.{field} is out of range: {minutes}"),
    }
}
