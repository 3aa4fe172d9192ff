pub mod detections;
pub mod levels;
pub mod timefmt;
pub mod validation;

pub use detections::{Centroid, DetectionError, DetectionRecord, ImageShape};
pub use levels::{DensityLevel, Severity};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
