#![allow(clippy::expect_used)]

use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Frame Metrics ====
    pub static ref CROWD_FRAMES_PROCESSED: IntCounter = {
        let metric = IntCounter::new(
            "crowd_frames_processed_total",
            "Total number of frames processed successfully",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref CROWD_FRAMES_SKIPPED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowd_frames_skipped_total",
                "Total number of frames skipped due to per-frame errors",
            ),
            &["reason"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref CROWD_FRAMES_PENDING: IntCounter = {
        let metric = IntCounter::new(
            "crowd_frames_pending_total",
            "Frames recorded before the baseline was calibrated",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref CROWD_FRAME_DURATION: Histogram = {
        let metric = Histogram::with_opts(
            HistogramOpts::new(
                "crowd_frame_duration_seconds",
                "Time spent scoring, tracking and alerting one frame",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Tracking Metrics ====
    pub static ref CROWD_LIVE_TRACKS: IntGauge = {
        let metric = IntGauge::new("crowd_live_tracks", "Number of live person tracks")
            .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Alert Metrics ====
    pub static ref CROWD_ALERTS_GENERATED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowd_alerts_generated_total",
                "Total number of alerts generated",
            ),
            &["severity"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref CROWD_SUMMARY_FALLBACKS: IntCounter = {
        let metric = IntCounter::new(
            "crowd_summary_fallbacks_total",
            "Summaries replaced by fallback text after a summarizer failure",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}

/// Helper function to encode metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
    })
}
