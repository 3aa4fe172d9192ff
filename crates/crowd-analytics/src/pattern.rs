//! Count-level comparison of the current frame with its calibration window.

use crate::baseline::BaselineStats;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPattern {
    pub avg_people: f64,
    pub peak_people: f64,
    pub current_people: u32,
    /// Percent change from `avg_people`; `None` against an empty baseline
    pub deviation_percent: Option<f64>,
    pub baseline_source: String,
}

impl HistoricalPattern {
    /// Compare `current_people` against a calibrated person-count baseline
    pub fn from_baseline(stats: &BaselineStats, current_people: u32) -> Self {
        let deviation_percent = if stats.mean == 0.0 {
            None
        } else {
            Some((current_people as f64 - stats.mean) / stats.mean * 100.0)
        };

        Self {
            avg_people: stats.mean,
            peak_people: stats.peak,
            current_people,
            deviation_percent,
            baseline_source: format!("first {} frames of video", stats.samples),
        }
    }
}

impl fmt::Display for HistoricalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Baseline: {:.0}. Current: {}", self.avg_people, self.current_people)?;
        if let Some(deviation) = self.deviation_percent {
            write!(f, " ({:+.0}%)", deviation)?;
        }
        write!(f, ". Peak: {}", self.peak_people)
    }
}
