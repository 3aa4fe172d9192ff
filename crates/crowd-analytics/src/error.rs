use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("invalid frame shape {height}x{width}: area must be positive")]
    InvalidShape { height: i64, width: i64 },
}
