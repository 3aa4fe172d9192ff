//! Frame-by-frame crowd anomaly pipeline: wires the analytics components and
//! the alert lifecycle together, and persists the run's artifacts.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod source;
pub mod stream;
pub mod summary;

pub use artifacts::{AlertsTimeline, ArtifactSet, TimelineEntry};
pub use config::{PipelineConfig, SummarizerConfig};
pub use error::{FrameError, PipelineError};
pub use orchestrator::{FrameOutcome, FrameState, Orchestrator, RunReport};
pub use stream::{run_jsonl, run_stream, StreamStats};
pub use summary::{
    deviation_label, OpenRouterSummarizer, Summarizer, SummaryError, SummaryRequest,
    TemplateSummarizer,
};
