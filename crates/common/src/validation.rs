//! Input validation for detector output and operator-supplied labels
//!
//! Detection records come from an external collaborator, so every field the
//! analytics core relies on is checked here before any component state is
//! touched:
//! - centroid and confidence lists must match `person_count`
//! - confidences must lie in [0, 1]
//! - timestamps and coordinates must be finite

use crate::detections::{DetectionError, DetectionRecord};
use anyhow::{anyhow, Result};

// ============================================================================
// CONSTANTS: Input Size Limits
// ============================================================================

/// Maximum length for zone labels
pub const MAX_ZONE_LENGTH: usize = 256;

// ============================================================================
// String Validation
// ============================================================================

/// Validate string length against a maximum
pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

/// Validate non-empty string
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Validate a zone label
pub fn validate_zone(zone: &str) -> Result<()> {
    validate_non_empty(zone, "zone")?;
    validate_length(zone, MAX_ZONE_LENGTH, "zone")?;
    Ok(())
}

// ============================================================================
// Detection Validation
// ============================================================================

/// Validate a detection record
pub fn validate_detection(record: &DetectionRecord) -> Result<(), DetectionError> {
    let frame_index = record.frame_index;
    let expected = record.person_count as usize;

    if !record.timestamp.is_finite() {
        return Err(DetectionError::NonFinite {
            frame_index,
            field: "timestamp",
        });
    }

    if record.centroids.len() != expected {
        return Err(DetectionError::CentroidCountMismatch {
            frame_index,
            expected,
            actual: record.centroids.len(),
        });
    }

    if record.confidences.len() != expected {
        return Err(DetectionError::ConfidenceCountMismatch {
            frame_index,
            expected,
            actual: record.confidences.len(),
        });
    }

    if record
        .centroids
        .iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(DetectionError::NonFinite {
            frame_index,
            field: "centroids",
        });
    }

    for &value in &record.confidences {
        validate_unit_interval(value).map_err(|_| DetectionError::ConfidenceOutOfRange {
            frame_index,
            value,
        })?;
    }

    Ok(())
}

/// Validate that a value lies in [0, 1]
pub fn validate_unit_interval(value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("value {} is outside [0, 1]", value));
    }
    Ok(())
}
