//! Configuration loading and validation utilities.

use std::{fmt::Display, path::PathBuf, str::FromStr};

use clap::Parser;
use serde::{Deserialize, Deserializer};
use tokio::fs;
use tracing::instrument;

use crate::SchedulerError;

/// Default number of simultaneously active media handles.
pub const DEFAULT_CAPACITY: usize = 6;
/// Default fraction of an element that must be on screen.
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.1;
/// Default viewport expansion in logical pixels.
pub const DEFAULT_PROXIMITY_MARGIN: f32 = 50.0;

/// Command-line arguments used by the scroll replay driver.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Replays a scroll scenario through the media scheduler")]
pub struct CliArgs {
    /// Location of the scheduler configuration document.
    #[arg(long, value_name = "PATH", default_value = "scheduler.toml")]
    pub config: PathBuf,
    /// Location of the scroll scenario document.
    #[arg(long, value_name = "PATH", default_value = "scenario.toml")]
    pub scenario: PathBuf,
    /// Capacity override.
    #[arg(long, value_name = "COUNT", env = "REELGATE_CAPACITY")]
    pub capacity: Option<usize>,
    /// Visibility threshold override.
    #[arg(long, value_name = "FRACTION", env = "REELGATE_THRESHOLD")]
    pub threshold: Option<f32>,
    /// Proximity margin override, e.g. `200px`.
    #[arg(long, value_name = "MARGIN", env = "REELGATE_MARGIN")]
    pub margin: Option<ProximityMargin>,
    /// Replay with the degraded always-visible source.
    #[arg(long)]
    pub degraded: bool,
}

/// Viewport expansion applied before intersection testing.
///
/// Accepts either a bare number or a CSS-like string such as `"200px"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityMargin(f32);

impl ProximityMargin {
    pub fn pixels(px: f32) -> Self {
        Self(px)
    }

    pub fn as_pixels(self) -> f32 {
        self.0
    }
}

impl Default for ProximityMargin {
    fn default() -> Self {
        Self(DEFAULT_PROXIMITY_MARGIN)
    }
}

impl Display for ProximityMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl FromStr for ProximityMargin {
    type Err = SchedulerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
        let px: f32 = number
            .parse()
            .map_err(|_| SchedulerError::Config(format!("invalid proximity margin '{raw}'")))?;
        Ok(Self(px))
    }
}

impl<'de> Deserialize<'de> for ProximityMargin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(px) => Ok(Self(px as f32)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Scheduler tuning knobs. Read-only once a scheduler is built.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub capacity: usize,
    pub visibility_threshold: f32,
    pub proximity_margin: ProximityMargin,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            proximity_margin: ProximityMargin::default(),
        }
    }
}

impl SchedulerConfig {
    /// Builds a configuration with the given capacity and default visibility settings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, SchedulerError> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| SchedulerError::Config(format!("invalid scheduler document: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.capacity == 0 {
            return Err(SchedulerError::Config(
                "capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(SchedulerError::Config(format!(
                "visibility threshold {} outside [0, 1]",
                self.visibility_threshold
            )));
        }
        let margin = self.proximity_margin.as_pixels();
        if !margin.is_finite() || margin < 0.0 {
            return Err(SchedulerError::Config(format!(
                "proximity margin {} must be a non-negative length",
                self.proximity_margin
            )));
        }
        Ok(())
    }
}

/// Fully merged configuration for the replay driver.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cli: CliArgs,
    pub scheduler: SchedulerConfig,
    pub scenario: crate::replay::Scenario,
}

impl AppConfig {
    #[instrument(skip_all)]
    pub async fn load(cli: CliArgs) -> Result<Self, SchedulerError> {
        let config_raw = fs::read_to_string(&cli.config)
            .await
            .map_err(|err| SchedulerError::Io(format!("failed to read config: {err}")))?;
        let mut scheduler: SchedulerConfig = toml::from_str(&config_raw)
            .map_err(|err| SchedulerError::Config(format!("invalid scheduler document: {err}")))?;

        if let Some(capacity) = cli.capacity {
            scheduler.capacity = capacity;
        }
        if let Some(threshold) = cli.threshold {
            scheduler.visibility_threshold = threshold;
        }
        if let Some(margin) = cli.margin {
            scheduler.proximity_margin = margin;
        }
        scheduler.validate()?;

        let scenario_raw = fs::read_to_string(&cli.scenario)
            .await
            .map_err(|err| SchedulerError::Io(format!("failed to read scenario: {err}")))?;
        let scenario = crate::replay::Scenario::from_toml_str(&scenario_raw)?;

        Ok(Self {
            cli,
            scheduler,
            scenario,
        })
    }
}
