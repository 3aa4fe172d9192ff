/// Fixed-window baseline calibration
///
/// The model collects the first `window_size` samples of a signal, then
/// freezes their mean, population standard deviation and peak. Later samples
/// are ignored: the baseline does not drift. Recalibration only happens
/// through an explicit [`BaselineModel::reset`].
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Frozen statistics of a calibrated baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub mean: f64,
    /// Population standard deviation; may be exactly 0
    pub std_dev: f64,
    /// Largest sample in the calibration window
    pub peak: f64,
    /// Number of samples the statistics were computed from
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct BaselineModel {
    window_size: usize,
    samples: Vec<f64>,
    stats: Option<BaselineStats>,
}

impl BaselineModel {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            samples: Vec::with_capacity(window_size),
            stats: None,
        }
    }

    /// Append a sample to the calibration window.
    ///
    /// Returns `true` only for the sample that completes calibration. Once
    /// calibrated this is a no-op returning `false`.
    pub fn add_sample(&mut self, value: f64) -> bool {
        if self.stats.is_some() {
            return false;
        }

        self.samples.push(value);
        if self.samples.len() < self.window_size {
            return false;
        }

        let (mean, std_dev) = Self::calculate_stats(&self.samples);
        let peak = self.samples.iter().copied().fold(f64::MIN, f64::max);
        self.stats = Some(BaselineStats {
            mean,
            std_dev,
            peak,
            samples: self.samples.len(),
        });

        tracing::debug!(
            mean,
            std_dev,
            peak,
            window_size = self.window_size,
            "Baseline calibrated"
        );
        true
    }

    /// Calibrated statistics, or `None` while still collecting samples
    pub fn stats(&self) -> Option<BaselineStats> {
        self.stats
    }

    pub fn is_calibrated(&self) -> bool {
        self.stats.is_some()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Discard the window and start calibrating again
    pub fn reset(&mut self) {
        self.samples.clear();
        self.stats = None;
    }

    /// Mean and population standard deviation (Welford's update).
    ///
    /// A constant window yields exactly that value as the mean and a std of
    /// exactly 0.
    pub fn calculate_stats(data: &[f64]) -> (f64, f64) {
        if data.is_empty() {
            return (0.0, 0.0);
        }

        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, &x) in data.iter().enumerate() {
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }

        (mean, (m2 / data.len() as f64).max(0.0).sqrt())
    }
}

impl Default for BaselineModel {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
