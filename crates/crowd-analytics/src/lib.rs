//! Crowd analytics core: baseline calibration, density scoring, anomaly
//! classification, spatial density maps and identity tracking.
//!
//! Every component owns its state explicitly; nothing here is shared or
//! global. Callers drive the components frame by frame in `frame_index`
//! order.

pub mod anomaly;
pub mod baseline;
pub mod density;
pub mod error;
pub mod pattern;
pub mod spatial;
pub mod tracker;

pub use anomaly::{AnomalyClassifier, AnomalyConfig, AnomalyResult};
pub use baseline::{BaselineModel, BaselineStats};
pub use density::{DensityConfig, DensityResult, DensityScorer};
pub use error::AnalyticsError;
pub use pattern::HistoricalPattern;
pub use spatial::{SpatialConfig, SpatialMap, SpatialSummary};
pub use tracker::{IdentityTracker, Track, TrackId};
