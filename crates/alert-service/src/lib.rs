pub mod manager;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use manager::{
    is_expired, operator_note, AlertConfig, AlertConfigError, AlertLifecycleManager, MAX_TTL_MINUTES,
};
pub use store::{AlertTimeline, TimelineError};
pub use types::*;
