/// Z-score anomaly classification with confidence gating
///
/// Two independent signals come out of a classification:
/// 1. `severity`: banding of |z| into LOW / MEDIUM / HIGH, forced to LOW when
///    the detector's confidence is too low to act on
/// 2. `is_anomaly`: whether the density crosses `mean + k * std`
///
/// The two can disagree (a HIGH severity with `is_anomaly == false` happens
/// when `std` is tiny) and callers get both.
///
/// A baseline with zero spread reports `z_score == 0`, yet any departure from
/// that flat baseline is an unbounded number of standard deviations away, so
/// it bands as HIGH. Only an exact match with the mean stays LOW.
use common::Severity;
use serde::{Deserialize, Serialize};

const DEFAULT_SENSITIVITY: f64 = 2.0; // Standard deviations for the anomaly threshold
const DEFAULT_MEDIUM_Z: f64 = 1.5;
const DEFAULT_HIGH_Z: f64 = 2.0;
const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Threshold multiplier `k` in `mean + k * std`
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// |z| at which severity becomes MEDIUM
    #[serde(default = "default_medium_z")]
    pub medium_z: f64,

    /// |z| at which severity becomes HIGH
    #[serde(default = "default_high_z")]
    pub high_z: f64,

    /// Frames with a lower mean detection confidence never escalate
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}

fn default_medium_z() -> f64 {
    DEFAULT_MEDIUM_Z
}

fn default_high_z() -> f64 {
    DEFAULT_HIGH_Z
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            medium_z: DEFAULT_MEDIUM_Z,
            high_z: DEFAULT_HIGH_Z,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub z_score: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AnomalyClassifier {
    config: AnomalyConfig,
}

impl AnomalyClassifier {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Standard score of `value`; 0 when the baseline has no spread
    pub fn z_score(value: f64, mean: f64, std: f64) -> f64 {
        if std == 0.0 {
            return 0.0;
        }
        (value - mean) / std
    }

    /// Ungated severity band for a z-score
    pub fn severity_for(&self, z_score: f64) -> Severity {
        let z = z_score.abs();
        if z < self.config.medium_z {
            Severity::Low
        } else if z < self.config.high_z {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    pub fn classify(&self, density: f64, mean: f64, std: f64, confidence: f64) -> AnomalyResult {
        let z_score = Self::z_score(density, mean, std);

        let threshold = mean + self.config.sensitivity * std;
        let is_anomaly = density > threshold;

        let severity = if confidence < self.config.min_confidence {
            Severity::Low
        } else if std == 0.0 {
            if density == mean {
                Severity::Low
            } else {
                Severity::High
            }
        } else {
            self.severity_for(z_score)
        };

        AnomalyResult {
            z_score,
            is_anomaly,
            severity,
            threshold,
        }
    }
}
