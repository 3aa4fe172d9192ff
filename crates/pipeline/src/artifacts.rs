//! Persisted run artifacts: the alert timeline JSON and the tabular CSVs.
//!
//! Every row type is flat so the CSV files map one column per field, and
//! floats are written in shortest round-trip form, so reading a file back
//! yields identical values.

use crate::error::PipelineError;
use alert_service::Alert;
use chrono::{DateTime, Utc};
use common::{DensityLevel, Severity};
use crowd_analytics::{BaselineStats, HistoricalPattern, TrackId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TIMELINE_FILE: &str = "alerts_timeline.json";
pub const FRAMES_FILE: &str = "frames.csv";
pub const ANOMALIES_FILE: &str = "anomalies.csv";
pub const ALERTS_FILE: &str = "alerts.csv";
pub const TRACKS_FILE: &str = "tracks.csv";
pub const BASELINES_FILE: &str = "baselines.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRow {
    pub image_id: String,
    pub frame_index: u64,
    pub timestamp: f64,
    pub person_count: u32,
    pub global_density: f64,
    /// Mean detection confidence
    pub confidence: f64,
    /// Empty while the baseline is still calibrating
    pub density_level: Option<DensityLevel>,
    pub hot_cells: usize,
    pub max_local_density: f64,
}

/// Whether the density crossed the anomaly threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnomalyFlag {
    Atypical,
    Normal,
}

impl From<bool> for AnomalyFlag {
    fn from(is_anomaly: bool) -> Self {
        if is_anomaly {
            AnomalyFlag::Atypical
        } else {
            AnomalyFlag::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    pub image_id: String,
    pub frame_index: u64,
    pub person_count: u32,
    pub global_density: f64,
    pub z_score: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub anomaly_type: AnomalyFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    pub frame_index: u64,
    pub track_id: TrackId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRow {
    pub metric: String,
    pub value: f64,
}

/// One alert as shown on the operator timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Seconds from the start of the stream
    pub timestamp: f64,
    pub frame_index: u64,
    pub alert_id: String,
    pub person_count: u32,
    pub severity: Severity,
    pub summary: String,
    pub pattern: Option<HistoricalPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsTimeline {
    pub baseline_mean: Option<f64>,
    pub baseline_peak_or_threshold: Option<f64>,
    /// Newest first
    pub alerts: Vec<TimelineEntry>,
    #[serde(with = "common::timefmt")]
    pub processed: DateTime<Utc>,
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn write_timeline(path: &Path, timeline: &AlertsTimeline) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(timeline)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_timeline(path: &Path) -> Result<AlertsTimeline, PipelineError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// `metric,value` rows for the calibrated baselines
pub fn baseline_rows(density: Option<&BaselineStats>, people: Option<&BaselineStats>) -> Vec<BaselineRow> {
    let mut rows = Vec::new();
    let mut push = |metric: &str, value: f64| {
        rows.push(BaselineRow {
            metric: metric.to_string(),
            value,
        })
    };

    if let Some(stats) = density {
        push("baseline_mean", stats.mean);
        push("baseline_std", stats.std_dev);
    }
    if let Some(stats) = people {
        push("baseline_people_mean", stats.mean);
        push("baseline_people_std", stats.std_dev);
        push("baseline_people_peak", stats.peak);
    }
    rows
}

/// Everything a run persists, ready to be written
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub timeline: AlertsTimeline,
    pub frames: Vec<FrameRow>,
    pub anomalies: Vec<AnomalyRow>,
    /// Status materialized at write time
    pub alerts: Vec<Alert>,
    pub tracks: Vec<TrackRow>,
    pub baselines: Vec<BaselineRow>,
}

impl ArtifactSet {
    /// Write every artifact into `dir`, creating it if needed
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        fs::create_dir_all(dir)?;

        let timeline = dir.join(TIMELINE_FILE);
        write_timeline(&timeline, &self.timeline)?;

        let frames = dir.join(FRAMES_FILE);
        write_csv(&frames, &self.frames)?;

        let anomalies = dir.join(ANOMALIES_FILE);
        write_csv(&anomalies, &self.anomalies)?;

        let alerts = dir.join(ALERTS_FILE);
        write_csv(&alerts, &self.alerts)?;

        let tracks = dir.join(TRACKS_FILE);
        write_csv(&tracks, &self.tracks)?;

        let baselines = dir.join(BASELINES_FILE);
        write_csv(&baselines, &self.baselines)?;

        tracing::info!(dir = %dir.display(), "Artifacts written");
        Ok(vec![timeline, frames, anomalies, alerts, tracks, baselines])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_frame_row_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");

        let rows = vec![
            FrameRow {
                image_id: "frame_000000".to_string(),
                frame_index: 0,
                timestamp: 0.0,
                person_count: 10,
                global_density: 10.0 / 307_200.0,
                confidence: 0.9,
                density_level: None,
                hot_cells: 2,
                max_local_density: 1.2345678901234,
            },
            FrameRow {
                image_id: "cam, north.jpg".to_string(),
                frame_index: 31,
                timestamp: 1.0333333333333334,
                person_count: 50,
                global_density: 50.0 / 307_200.0,
                confidence: 0.0,
                density_level: Some(DensityLevel::High),
                hot_cells: 0,
                max_local_density: 0.0,
            },
        ];
        write_csv(&path, &rows).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("image_id,frame_index,timestamp,person_count,global_density,confidence,density_level"));

        let back: Vec<FrameRow> = read_csv(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_anomaly_flag_wire_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomalies.csv");
        let rows = vec![AnomalyRow {
            image_id: "frame_000030".to_string(),
            frame_index: 30,
            person_count: 50,
            global_density: 0.5,
            z_score: 0.0,
            threshold: 0.1,
            severity: Severity::High,
            anomaly_type: AnomalyFlag::from(true),
        }];
        write_csv(&path, &rows).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(",HIGH,ATYPICAL"));
        assert_eq!(read_csv::<AnomalyRow>(&path).unwrap(), rows);
    }

    #[test]
    fn test_baseline_rows() {
        let stats = BaselineStats {
            mean: 10.0,
            std_dev: 0.0,
            peak: 10.0,
            samples: 30,
        };
        let rows = baseline_rows(Some(&stats), Some(&stats));
        let metrics: Vec<_> = rows.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(
            metrics,
            vec![
                "baseline_mean",
                "baseline_std",
                "baseline_people_mean",
                "baseline_people_std",
                "baseline_people_peak"
            ]
        );
        assert!(baseline_rows(None, None).is_empty());
    }
}
