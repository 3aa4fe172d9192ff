use alert_service::AlertConfig;
use anyhow::Context;
use common::validation;
use crowd_analytics::{AnomalyConfig, DensityConfig, SpatialConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

const DEFAULT_ZONE: &str = "Zone A";
const DEFAULT_CALIBRATION_WINDOW: usize = 30;
const DEFAULT_MAX_TRACK_DISTANCE: f64 = 50.0;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

const DEFAULT_SUMMARY_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_SUMMARY_MODEL: &str = "deepseek/deepseek-chat";
const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 30;

/// Settings for the natural-language summarization collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Bearer token; without one the offline template summarizer is used
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API
    #[serde(default = "default_summary_url")]
    pub base_url: String,

    #[serde(default = "default_summary_model")]
    pub model: String,

    #[serde(default = "default_summary_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_summary_url() -> String {
    DEFAULT_SUMMARY_URL.to_string()
}

fn default_summary_model() -> String {
    DEFAULT_SUMMARY_MODEL.to_string()
}

fn default_summary_timeout_secs() -> u64 {
    DEFAULT_SUMMARY_TIMEOUT_SECS
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_summary_url(),
            model: default_summary_model(),
            timeout_secs: DEFAULT_SUMMARY_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Location label stamped on alerts and summaries
    #[serde(default = "default_zone")]
    pub zone: String,

    /// Frames collected before the baseline freezes
    #[serde(default = "default_calibration_window")]
    pub calibration_window: usize,

    #[serde(default)]
    pub density: DensityConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub spatial: SpatialConfig,

    /// Pixel distance below which a centroid continues a track
    #[serde(default = "default_max_track_distance")]
    pub max_track_distance: f64,

    #[serde(default)]
    pub alerts: AlertConfig,

    /// Detection records buffered between producer and consumer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

fn default_zone() -> String {
    DEFAULT_ZONE.to_string()
}

fn default_calibration_window() -> usize {
    DEFAULT_CALIBRATION_WINDOW
}

fn default_max_track_distance() -> f64 {
    DEFAULT_MAX_TRACK_DISTANCE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zone: default_zone(),
            calibration_window: DEFAULT_CALIBRATION_WINDOW,
            density: DensityConfig::default(),
            anomaly: AnomalyConfig::default(),
            spatial: SpatialConfig::default(),
            max_track_distance: DEFAULT_MAX_TRACK_DISTANCE,
            alerts: AlertConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            summarizer: SummarizerConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    /// Reject settings no run can work with
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_zone(&self.zone)?;
        validation::validate_unit_interval(self.anomaly.min_confidence)
            .context("invalid min_confidence")?;
        if self.max_track_distance <= 0.0 || !self.max_track_distance.is_finite() {
            anyhow::bail!("max_track_distance must be positive (got {})", self.max_track_distance);
        }
        self.alerts.validate()?;
        Ok(())
    }

    /// Defaults overridden by `CROWD_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let summarizer = SummarizerConfig {
            api_key: env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var("CROWD_SUMMARY_URL").unwrap_or(defaults.summarizer.base_url),
            model: env::var("CROWD_SUMMARY_MODEL").unwrap_or(defaults.summarizer.model),
            timeout_secs: env_or("CROWD_SUMMARY_TIMEOUT_SECS", defaults.summarizer.timeout_secs),
        };

        Self {
            zone: env::var("CROWD_ZONE").unwrap_or(defaults.zone),
            calibration_window: env_or("CROWD_CALIBRATION_WINDOW", defaults.calibration_window),
            density: defaults.density,
            anomaly: AnomalyConfig {
                sensitivity: env_or("CROWD_SENSITIVITY", defaults.anomaly.sensitivity),
                min_confidence: env_or("CROWD_MIN_CONFIDENCE", defaults.anomaly.min_confidence),
                ..defaults.anomaly
            },
            spatial: SpatialConfig {
                grid_size: env_or("CROWD_GRID_SIZE", defaults.spatial.grid_size),
                ..defaults.spatial
            },
            max_track_distance: env_or("CROWD_MAX_TRACK_DISTANCE", defaults.max_track_distance),
            alerts: AlertConfig {
                ttl_minutes: env_or("CROWD_ALERT_TTL_MINUTES", defaults.alerts.ttl_minutes),
            },
            queue_capacity: env_or("CROWD_QUEUE_CAPACITY", defaults.queue_capacity),
            summarizer,
        }
    }
}
