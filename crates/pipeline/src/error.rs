use alert_service::TimelineError;
use common::DetectionError;
use crowd_analytics::AnalyticsError;
use thiserror::Error;

/// Reasons a single frame is skipped. None of them stop the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error(transparent)]
    InvalidShape(#[from] AnalyticsError),

    #[error("malformed detection: {0}")]
    MalformedDetection(#[from] DetectionError),

    #[error("frame {frame_index} arrived after frame {last_frame_index}")]
    OutOfOrderFrame {
        frame_index: u64,
        last_frame_index: u64,
    },

    #[error("frame {frame_index} has timestamp {timestamp}, not after {last_timestamp}")]
    NonIncreasingTimestamp {
        frame_index: u64,
        timestamp: f64,
        last_timestamp: f64,
    },
}

impl FrameError {
    /// Label used for the skipped-frames metric
    pub fn reason(&self) -> &'static str {
        match self {
            FrameError::InvalidShape(_) => "invalid_shape",
            FrameError::MalformedDetection(_) => "malformed_detection",
            FrameError::OutOfOrderFrame { .. } | FrameError::NonIncreasingTimestamp { .. } => {
                "out_of_order"
            }
        }
    }
}

/// Run-level failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no frames were processed")]
    NoFramesProcessed,

    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV artifact error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON artifact error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error("detection producer failed: {0}")]
    Producer(String),
}
