use crate::artifacts::{
    baseline_rows, AlertsTimeline, AnomalyFlag, AnomalyRow, ArtifactSet, FrameRow, TimelineEntry,
    TrackRow,
};
use crate::config::PipelineConfig;
use crate::error::{FrameError, PipelineError};
use crate::summary::{Summarizer, SummaryRequest};
use alert_service::{Alert, AlertContext, AlertLifecycleManager, AlertTimeline};
use chrono::{DateTime, Utc};
use common::{Centroid, DetectionError, DetectionRecord};
use crowd_analytics::{
    AnomalyClassifier, AnomalyResult, BaselineModel, BaselineStats, DensityResult, DensityScorer,
    HistoricalPattern, IdentityTracker, SpatialMap, SpatialSummary, TrackId,
};
use std::collections::BTreeMap;
use telemetry::metrics::{
    CROWD_ALERTS_GENERATED, CROWD_FRAMES_PENDING, CROWD_FRAMES_PROCESSED, CROWD_FRAMES_SKIPPED,
    CROWD_FRAME_DURATION, CROWD_LIVE_TRACKS, CROWD_SUMMARY_FALLBACKS,
};
use tracing::{debug, info, warn};

/// What happened to one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub frame_index: u64,
    pub global_density: f64,
    pub confidence: f64,
    pub tracks: BTreeMap<TrackId, Centroid>,
    pub spatial: SpatialSummary,
    pub state: FrameState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameState {
    /// Recorded while the baseline was still calibrating
    Pending,
    Evaluated {
        density: DensityResult,
        anomaly: AnomalyResult,
        alert: Option<Alert>,
    },
}

impl FrameOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self.state, FrameState::Pending)
    }

    pub fn alert(&self) -> Option<&Alert> {
        match &self.state {
            FrameState::Evaluated { alert, .. } => alert.as_ref(),
            FrameState::Pending => None,
        }
    }
}

/// Drives the per-frame sequence and owns every piece of run state.
///
/// Frames must arrive in strictly increasing `frame_index` order. A frame
/// that fails validation is skipped before it touches any component, so a
/// bad record never perturbs the baseline or the live tracks.
pub struct Orchestrator {
    zone: String,
    density_baseline: BaselineModel,
    people_baseline: BaselineModel,
    scorer: DensityScorer,
    classifier: AnomalyClassifier,
    tracker: IdentityTracker,
    spatial: SpatialMap,
    alerts: AlertLifecycleManager,
    summarizer: Box<dyn Summarizer>,

    last_frame_index: Option<u64>,
    last_timestamp: Option<f64>,
    frames_processed: u64,
    frames_skipped: u64,

    frames: Vec<FrameRow>,
    anomalies: Vec<AnomalyRow>,
    tracks: Vec<TrackRow>,
    entries: Vec<TimelineEntry>,
}

impl Orchestrator {
    pub fn new(config: &PipelineConfig, summarizer: Box<dyn Summarizer>) -> Self {
        Self {
            zone: config.zone.clone(),
            density_baseline: BaselineModel::new(config.calibration_window),
            people_baseline: BaselineModel::new(config.calibration_window),
            scorer: DensityScorer::new(config.density),
            classifier: AnomalyClassifier::new(config.anomaly),
            tracker: IdentityTracker::new(config.max_track_distance),
            spatial: SpatialMap::new(config.spatial),
            alerts: AlertLifecycleManager::new(&config.alerts),
            summarizer,
            last_frame_index: None,
            last_timestamp: None,
            frames_processed: 0,
            frames_skipped: 0,
            frames: Vec::new(),
            anomalies: Vec::new(),
            tracks: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn density_baseline(&self) -> Option<BaselineStats> {
        self.density_baseline.stats()
    }

    pub fn people_baseline(&self) -> Option<BaselineStats> {
        self.people_baseline.stats()
    }

    pub fn alert_timeline(&self) -> &AlertTimeline {
        self.alerts.timeline()
    }

    /// Process one item from a detection source; parse failures count as
    /// skipped frames.
    pub async fn process_item(
        &mut self,
        item: Result<DetectionRecord, DetectionError>,
    ) -> Result<FrameOutcome, FrameError> {
        match item {
            Ok(record) => self.process_frame(record).await,
            Err(e) => {
                let err = FrameError::from(e);
                self.record_skip(None, &err);
                Err(err)
            }
        }
    }

    pub async fn process_frame(&mut self, record: DetectionRecord) -> Result<FrameOutcome, FrameError> {
        let frame_index = record.frame_index;
        let timer = CROWD_FRAME_DURATION.start_timer();

        let result = self.evaluate(record).await;
        timer.observe_duration();

        match &result {
            Ok(_) => {
                self.frames_processed += 1;
                CROWD_FRAMES_PROCESSED.inc();
            }
            Err(err) => self.record_skip(Some(frame_index), err),
        }
        result
    }

    fn record_skip(&mut self, frame_index: Option<u64>, err: &FrameError) {
        self.frames_skipped += 1;
        CROWD_FRAMES_SKIPPED.with_label_values(&[err.reason()]).inc();
        warn!(frame_index = ?frame_index, reason = err.reason(), error = %err, "Frame skipped");
    }

    async fn evaluate(&mut self, record: DetectionRecord) -> Result<FrameOutcome, FrameError> {
        if let Some(last) = self.last_frame_index {
            if record.frame_index <= last {
                return Err(FrameError::OutOfOrderFrame {
                    frame_index: record.frame_index,
                    last_frame_index: last,
                });
            }
        }

        if let Some(last) = self.last_timestamp {
            if record.timestamp <= last {
                return Err(FrameError::NonIncreasingTimestamp {
                    frame_index: record.frame_index,
                    timestamp: record.timestamp,
                    last_timestamp: last,
                });
            }
        }

        record.validate()?;
        let global_density = DensityScorer::compute_density(record.person_count, record.image_shape)?;
        let spatial = self.spatial.compute(&record.centroids, record.image_shape)?;

        // the frame is accepted from here on; components may change state
        self.last_frame_index = Some(record.frame_index);
        self.last_timestamp = Some(record.timestamp);
        let confidence = record.mean_confidence();
        let image_id = record.frame_id();

        let tracks = self.tracker.track(&record.centroids);
        CROWD_LIVE_TRACKS.set(tracks.len() as i64);
        self.tracks.extend(tracks.iter().map(|(&track_id, c)| TrackRow {
            frame_index: record.frame_index,
            track_id,
            x: c.x,
            y: c.y,
        }));
        debug!(
            frame_index = record.frame_index,
            live_tracks = tracks.len(),
            next_track_id = self.tracker.next_id(),
            "Tracks updated"
        );

        let stats = match (self.density_baseline.stats(), self.people_baseline.stats()) {
            (Some(density), Some(people)) => Some((density, people)),
            _ => {
                self.calibrate(global_density, record.person_count);
                None
            }
        };

        let mut row = FrameRow {
            image_id: image_id.clone(),
            frame_index: record.frame_index,
            timestamp: record.timestamp,
            person_count: record.person_count,
            global_density,
            confidence,
            density_level: None,
            hot_cells: spatial.hot_cells,
            max_local_density: spatial.max_local_density,
        };

        let Some((density_stats, people_stats)) = stats else {
            CROWD_FRAMES_PENDING.inc();
            self.frames.push(row);
            return Ok(FrameOutcome {
                frame_index: record.frame_index,
                global_density,
                confidence,
                tracks,
                spatial,
                state: FrameState::Pending,
            });
        };

        let density = DensityResult {
            global_density,
            bucket: self
                .scorer
                .bucket(global_density, density_stats.mean, density_stats.std_dev),
        };
        let anomaly = self.classifier.classify(
            global_density,
            density_stats.mean,
            density_stats.std_dev,
            confidence,
        );

        row.density_level = Some(density.bucket);
        self.frames.push(row);
        self.anomalies.push(AnomalyRow {
            image_id,
            frame_index: record.frame_index,
            person_count: record.person_count,
            global_density,
            z_score: anomaly.z_score,
            threshold: anomaly.threshold,
            severity: anomaly.severity,
            anomaly_type: AnomalyFlag::from(anomaly.is_anomaly),
        });

        let ctx = AlertContext {
            zone: self.zone.clone(),
            person_count: record.person_count,
            baseline_density: density_stats.mean,
            baseline_people: people_stats.mean,
        };
        let alert = self.alerts.generate(&anomaly, &ctx);

        if let Some(alert) = &alert {
            CROWD_ALERTS_GENERATED
                .with_label_values(&[alert.severity.as_str()])
                .inc();

            let pattern = HistoricalPattern::from_baseline(&people_stats, record.person_count);
            let summary = self
                .summarize(SummaryRequest {
                    zone: self.zone.clone(),
                    person_count: record.person_count,
                    density_level: density.bucket,
                    baseline_mean: people_stats.mean,
                    baseline_std: people_stats.std_dev,
                    z_score: anomaly.z_score,
                    pattern: Some(pattern.clone()),
                })
                .await;

            self.entries.push(TimelineEntry {
                timestamp: record.timestamp,
                frame_index: record.frame_index,
                alert_id: alert.alert_id.clone(),
                person_count: record.person_count,
                severity: alert.severity,
                summary,
                pattern: Some(pattern),
            });
        }

        Ok(FrameOutcome {
            frame_index: record.frame_index,
            global_density,
            confidence,
            tracks,
            spatial,
            state: FrameState::Evaluated {
                density,
                anomaly,
                alert,
            },
        })
    }

    fn calibrate(&mut self, global_density: f64, person_count: u32) {
        let density_done = self.density_baseline.add_sample(global_density);
        self.people_baseline.add_sample(person_count as f64);

        if density_done {
            if let (Some(density), Some(people)) =
                (self.density_baseline.stats(), self.people_baseline.stats())
            {
                info!(
                    zone = %self.zone,
                    density_mean = density.mean,
                    density_std = density.std_dev,
                    people_mean = people.mean,
                    people_peak = people.peak,
                    samples = density.samples,
                    "Baseline calibrated"
                );
            }
        }
    }

    async fn summarize(&self, request: SummaryRequest) -> String {
        match self.summarizer.summarize(&request).await {
            Ok(text) => text,
            Err(e) => {
                CROWD_SUMMARY_FALLBACKS.inc();
                warn!(
                    summarizer = self.summarizer.name(),
                    error = %e,
                    "Summarizer unavailable, using fallback text"
                );
                e.to_string()
            }
        }
    }

    /// Close the run. Fails only when not a single frame made it through.
    pub fn finish(self) -> Result<RunReport, PipelineError> {
        self.finish_at(common::timefmt::now())
    }

    pub fn finish_at(self, processed_at: DateTime<Utc>) -> Result<RunReport, PipelineError> {
        if self.frames_processed == 0 {
            return Err(PipelineError::NoFramesProcessed);
        }

        info!(
            frames_processed = self.frames_processed,
            frames_skipped = self.frames_skipped,
            alerts = self.alerts.timeline().len(),
            "Run finished"
        );

        Ok(RunReport {
            processed_at,
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            density_baseline: self.density_baseline.stats(),
            people_baseline: self.people_baseline.stats(),
            frames: self.frames,
            anomalies: self.anomalies,
            tracks: self.tracks,
            alerts: self.alerts.into_timeline(),
            entries: self.entries,
        })
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub processed_at: DateTime<Utc>,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub density_baseline: Option<BaselineStats>,
    pub people_baseline: Option<BaselineStats>,
    pub frames: Vec<FrameRow>,
    pub anomalies: Vec<AnomalyRow>,
    pub tracks: Vec<TrackRow>,
    pub alerts: AlertTimeline,
    /// Insertion order
    pub entries: Vec<TimelineEntry>,
}

impl RunReport {
    pub fn timeline(&self) -> AlertsTimeline {
        AlertsTimeline {
            baseline_mean: self.people_baseline.map(|s| s.mean),
            baseline_peak_or_threshold: self.people_baseline.map(|s| s.peak),
            alerts: self.entries.iter().rev().cloned().collect(),
            processed: self.processed_at,
        }
    }

    /// Artifacts with alert status evaluated at `now`
    pub fn artifacts_at(&self, now: DateTime<Utc>) -> ArtifactSet {
        ArtifactSet {
            timeline: self.timeline(),
            frames: self.frames.clone(),
            anomalies: self.anomalies.clone(),
            alerts: self.alerts.materialized_at(now),
            tracks: self.tracks.clone(),
            baselines: baseline_rows(self.density_baseline.as_ref(), self.people_baseline.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{SummaryError, TemplateSummarizer};
    use async_trait::async_trait;
    use common::{ImageShape, Severity};

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn summarize(&self, _request: &SummaryRequest) -> Result<String, SummaryError> {
            Err(SummaryError::Status {
                status: 503,
                body: "overloaded".to_string(),
            })
        }
    }

    fn frame(frame_index: u64, count: u32, confidence: f64) -> DetectionRecord {
        DetectionRecord {
            frame_index,
            timestamp: frame_index as f64 / 30.0,
            person_count: count,
            centroids: (0..count)
                .map(|i| Centroid::new(10.0 + 12.0 * i as f64, 240.0))
                .collect(),
            confidences: vec![confidence; count as usize],
            image_shape: ImageShape::new(480, 640),
            image_id: None,
            bboxes: vec![],
        }
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            calibration_window: 3,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pending_until_calibrated() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));

        for i in 0..3 {
            let outcome = orch.process_frame(frame(i, 4, 0.9)).await.unwrap();
            assert!(outcome.is_pending());
        }
        assert!(orch.density_baseline().is_some());

        let outcome = orch.process_frame(frame(3, 4, 0.9)).await.unwrap();
        match outcome.state {
            FrameState::Evaluated { anomaly, alert, .. } => {
                assert_eq!(anomaly.severity, Severity::Low);
                assert!(alert.is_none());
            }
            FrameState::Pending => panic!("frame after calibration must be evaluated"),
        }
    }

    #[tokio::test]
    async fn test_invalid_frames_do_not_touch_state() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));
        orch.process_frame(frame(0, 2, 0.9)).await.unwrap();

        let mut bad_shape = frame(1, 2, 0.9);
        bad_shape.image_shape = ImageShape::new(0, 640);
        assert!(matches!(
            orch.process_frame(bad_shape).await,
            Err(FrameError::InvalidShape(_))
        ));

        let mut mismatch = frame(2, 2, 0.9);
        mismatch.centroids.pop();
        assert!(matches!(
            orch.process_frame(mismatch).await,
            Err(FrameError::MalformedDetection(_))
        ));

        // the skipped frames never reached the baseline
        assert_eq!(orch.density_baseline.samples().len(), 1);
        assert_eq!(orch.frames_skipped(), 2);

        // frame 1 was rejected, so it may still arrive
        orch.process_frame(frame(1, 2, 0.9)).await.unwrap();
        assert_eq!(orch.frames_processed(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_frame() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));
        orch.process_frame(frame(5, 1, 0.9)).await.unwrap();

        let err = orch.process_frame(frame(5, 1, 0.9)).await.unwrap_err();
        assert_eq!(
            err,
            FrameError::OutOfOrderFrame {
                frame_index: 5,
                last_frame_index: 5
            }
        );
        assert!(orch.process_frame(frame(4, 1, 0.9)).await.is_err());
        assert!(orch.process_frame(frame(6, 1, 0.9)).await.is_ok());
    }

    #[tokio::test]
    async fn test_timestamp_must_increase() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));
        orch.process_frame(frame(0, 1, 0.9)).await.unwrap();

        let mut stale = frame(1, 1, 0.9);
        stale.timestamp = 0.0;
        assert_eq!(
            orch.process_frame(stale).await.unwrap_err(),
            FrameError::NonIncreasingTimestamp {
                frame_index: 1,
                timestamp: 0.0,
                last_timestamp: 0.0
            }
        );
        assert_eq!(orch.density_baseline.samples().len(), 1);

        assert!(orch.process_frame(frame(1, 1, 0.9)).await.is_ok());
        assert_eq!(orch.frames_skipped(), 1);
    }

    #[tokio::test]
    async fn test_summarizer_failure_falls_back() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(FailingSummarizer));
        for i in 0..3 {
            orch.process_frame(frame(i, 5, 0.9)).await.unwrap();
        }

        let outcome = orch.process_frame(frame(3, 40, 0.9)).await.unwrap();
        assert!(outcome.alert().is_some());

        let report = orch.finish().unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].summary, "LLM Error 503: overloaded");
    }

    #[tokio::test]
    async fn test_low_confidence_never_alerts() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));
        for i in 0..3 {
            orch.process_frame(frame(i, 5, 0.9)).await.unwrap();
        }

        let outcome = orch.process_frame(frame(3, 40, 0.3)).await.unwrap();
        assert!(outcome.alert().is_none());
        match outcome.state {
            FrameState::Evaluated { anomaly, .. } => {
                assert_eq!(anomaly.severity, Severity::Low);
                assert!(anomaly.is_anomaly);
            }
            FrameState::Pending => panic!("expected evaluation"),
        }
    }

    #[tokio::test]
    async fn test_tracks_follow_people() {
        let mut orch = Orchestrator::new(&small_config(), Box::new(TemplateSummarizer));
        let first = orch.process_frame(frame(0, 2, 0.9)).await.unwrap();
        assert_eq!(first.tracks.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        let mut moved = frame(1, 2, 0.9);
        for c in &mut moved.centroids {
            c.x += 3.0;
        }
        let second = orch.process_frame(moved).await.unwrap();
        assert_eq!(second.tracks.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

        let empty = orch.process_frame(frame(2, 0, 0.9)).await.unwrap();
        assert!(empty.tracks.is_empty());
        assert_eq!(empty.confidence, 0.0);

        let report = orch.finish().unwrap();
        assert_eq!(report.tracks.len(), 4);
    }

    #[test]
    fn test_finish_without_frames() {
        let orch = Orchestrator::new(&PipelineConfig::default(), Box::new(TemplateSummarizer));
        assert!(matches!(orch.finish(), Err(PipelineError::NoFramesProcessed)));
    }
}
