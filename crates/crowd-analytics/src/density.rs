/// Global density scoring and bucketing against a calibrated baseline
use crate::error::AnalyticsError;
use common::{DensityLevel, ImageShape};
use serde::{Deserialize, Serialize};

const DEFAULT_LOW_OFFSET: f64 = 0.25;
const DEFAULT_HIGH_OFFSET: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Densities below `mean - low_offset * std` are LOW
    #[serde(default = "default_low_offset")]
    pub low_offset: f64,

    /// Densities at or above `mean + high_offset * std` are HIGH
    #[serde(default = "default_high_offset")]
    pub high_offset: f64,
}

fn default_low_offset() -> f64 {
    DEFAULT_LOW_OFFSET
}

fn default_high_offset() -> f64 {
    DEFAULT_HIGH_OFFSET
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            low_offset: DEFAULT_LOW_OFFSET,
            high_offset: DEFAULT_HIGH_OFFSET,
        }
    }
}

/// Density of one frame and its bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityResult {
    pub global_density: f64,
    pub bucket: DensityLevel,
}

#[derive(Debug, Clone, Default)]
pub struct DensityScorer {
    config: DensityConfig,
}

impl DensityScorer {
    pub fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    /// Persons per pixel of frame area
    pub fn compute_density(person_count: u32, shape: ImageShape) -> Result<f64, AnalyticsError> {
        let area = shape.area();
        if area <= 0 {
            return Err(AnalyticsError::InvalidShape {
                height: shape.height,
                width: shape.width,
            });
        }
        Ok(person_count as f64 / area as f64)
    }

    /// Bucket a density relative to the baseline.
    ///
    /// With `std == 0` both band edges collapse onto the mean, so there is no
    /// MEDIUM band: anything below the mean is LOW, anything else HIGH.
    pub fn bucket(&self, density: f64, mean: f64, std: f64) -> DensityLevel {
        if density < mean - self.config.low_offset * std {
            DensityLevel::Low
        } else if density >= mean + self.config.high_offset * std {
            DensityLevel::High
        } else {
            DensityLevel::Medium
        }
    }

    /// Compute the density of a frame and bucket it in one step
    pub fn score(
        &self,
        person_count: u32,
        shape: ImageShape,
        mean: f64,
        std: f64,
    ) -> Result<DensityResult, AnalyticsError> {
        let global_density = Self::compute_density(person_count, shape)?;
        Ok(DensityResult {
            global_density,
            bucket: self.bucket(global_density, mean, std),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_density() {
        let density = DensityScorer::compute_density(50, ImageShape::new(10, 20)).unwrap();
        assert_eq!(density, 0.25);
    }

    #[test]
    fn test_invalid_shape() {
        for shape in [
            ImageShape::new(0, 640),
            ImageShape::new(480, 0),
            ImageShape::new(-4, 10),
            ImageShape::new(-4, -10),
        ] {
            assert_eq!(
                DensityScorer::compute_density(3, shape),
                Err(AnalyticsError::InvalidShape {
                    height: shape.height,
                    width: shape.width
                })
            );
        }
    }

    #[test]
    fn test_bucket_bands() {
        let scorer = DensityScorer::default();
        // mean 10, std 4: LOW below 9, HIGH from 15
        assert_eq!(scorer.bucket(8.9, 10.0, 4.0), DensityLevel::Low);
        assert_eq!(scorer.bucket(9.0, 10.0, 4.0), DensityLevel::Medium);
        assert_eq!(scorer.bucket(14.99, 10.0, 4.0), DensityLevel::Medium);
        assert_eq!(scorer.bucket(15.0, 10.0, 4.0), DensityLevel::High);
    }

    #[test]
    fn test_zero_std_has_no_medium_band() {
        let scorer = DensityScorer::default();
        assert_eq!(scorer.bucket(9.999, 10.0, 0.0), DensityLevel::Low);
        assert_eq!(scorer.bucket(10.0, 10.0, 0.0), DensityLevel::High);
        assert_eq!(scorer.bucket(50.0, 10.0, 0.0), DensityLevel::High);
    }

    #[test]
    fn test_frame_at_flat_baseline_is_high() {
        let shape = ImageShape::new(480, 640);
        let mut baseline = crate::BaselineModel::new(30);
        for _ in 0..30 {
            baseline.add_sample(DensityScorer::compute_density(7, shape).unwrap());
        }
        let stats = baseline.stats().unwrap();
        assert_eq!(stats.std_dev, 0.0);

        let scorer = DensityScorer::default();
        let result = scorer.score(7, shape, stats.mean, stats.std_dev).unwrap();
        assert_eq!(result.bucket, DensityLevel::High);
        let fewer = scorer.score(6, shape, stats.mean, stats.std_dev).unwrap();
        assert_eq!(fewer.bucket, DensityLevel::Low);
    }

    #[test]
    fn test_bucket_is_monotonic() {
        let scorer = DensityScorer::default();
        for (mean, std) in [(10.0, 4.0), (0.5, 0.0), (3.0, 0.1), (0.0, 2.0)] {
            let mut previous = DensityLevel::Low;
            for step in 0..2000 {
                let density = -5.0 + step as f64 * 0.01;
                let level = scorer.bucket(density, mean, std);
                assert!(level >= previous, "bucket regressed at density {}", density);
                previous = level;
            }
        }
    }

    #[test]
    fn test_score() {
        let scorer = DensityScorer::default();
        let result = scorer.score(2, ImageShape::new(1, 1), 1.0, 0.5).unwrap();
        assert_eq!(result.global_density, 2.0);
        assert_eq!(result.bucket, DensityLevel::High);
    }
}
