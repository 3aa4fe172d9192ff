//! Coarse spatial density map of a frame.
//!
//! Centroids are binned into a square grid over the frame, then the grid is
//! smoothed with a separable Gaussian kernel. Out-of-range samples of the
//! kernel are mirrored about the grid edge (`d c b a | a b c d | d c b a`),
//! and the kernel is truncated at four sigma.

use crate::error::AnalyticsError;
use common::{Centroid, ImageShape};
use serde::{Deserialize, Serialize};

const DEFAULT_GRID_SIZE: usize = 5;
const DEFAULT_SIGMA: f64 = 0.5;
const DEFAULT_HOT_THRESHOLD: f64 = 0.5;
const TRUNCATE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Cells per side
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Gaussian standard deviation in cells
    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Smoothed cells strictly above this are hot
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: f64,
}

fn default_grid_size() -> usize {
    DEFAULT_GRID_SIZE
}

fn default_sigma() -> f64 {
    DEFAULT_SIGMA
}

fn default_hot_threshold() -> f64 {
    DEFAULT_HOT_THRESHOLD
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            sigma: DEFAULT_SIGMA,
            hot_threshold: DEFAULT_HOT_THRESHOLD,
        }
    }
}

/// Smoothed grid of one frame with its hot-spot summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialSummary {
    /// Row-major, `grid[row][col]`, rows follow the image y axis
    pub grid: Vec<Vec<f64>>,
    pub hot_cells: usize,
    pub max_local_density: f64,
}

#[derive(Debug, Clone)]
pub struct SpatialMap {
    config: SpatialConfig,
    kernel: Vec<f64>,
}

impl SpatialMap {
    pub fn new(config: SpatialConfig) -> Self {
        let config = SpatialConfig {
            grid_size: config.grid_size.max(1),
            ..config
        };
        let kernel = gaussian_kernel(config.sigma);
        Self { config, kernel }
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    pub fn compute(
        &self,
        centroids: &[Centroid],
        shape: ImageShape,
    ) -> Result<SpatialSummary, AnalyticsError> {
        if shape.area() <= 0 {
            return Err(AnalyticsError::InvalidShape {
                height: shape.height,
                width: shape.width,
            });
        }

        let n = self.config.grid_size;
        let mut grid = vec![vec![0.0; n]; n];

        for c in centroids {
            let col = cell_index(c.x, shape.width as f64, n);
            let row = cell_index(c.y, shape.height as f64, n);
            grid[row][col] += 1.0;
        }

        let grid = self.smooth(grid);

        let hot_cells = grid
            .iter()
            .flatten()
            .filter(|&&v| v > self.config.hot_threshold)
            .count();
        let max_local_density = grid.iter().flatten().copied().fold(0.0, f64::max);

        Ok(SpatialSummary {
            grid,
            hot_cells,
            max_local_density,
        })
    }

    fn smooth(&self, grid: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        let n = grid.len();
        let radius = (self.kernel.len() / 2) as isize;

        // along rows (axis 0) first, then columns
        let mut pass = vec![vec![0.0; n]; n];
        for row in 0..n {
            for col in 0..n {
                pass[row][col] = self
                    .kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * grid[reflect(row as isize + k as isize - radius, n)][col])
                    .sum();
            }
        }

        let mut out = vec![vec![0.0; n]; n];
        for row in 0..n {
            for col in 0..n {
                out[row][col] = self
                    .kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * pass[row][reflect(col as isize + k as isize - radius, n)])
                    .sum();
            }
        }
        out
    }
}

impl Default for SpatialMap {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

/// Truncating cell index, clamped into the grid
fn cell_index(coord: f64, extent: f64, n: usize) -> usize {
    let idx = (coord / extent * n as f64).trunc();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(n - 1)
    }
}

/// Mirror an out-of-range index back into `0..n`, edge sample repeated
fn reflect(idx: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = idx.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ImageShape {
        ImageShape::new(500, 500)
    }

    #[test]
    fn test_kernel_is_normalized() {
        let kernel = gaussian_kernel(0.5);
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[2] - 0.786_570_7).abs() < 1e-6);
        assert!((kernel[1] - kernel[3]).abs() < 1e-15);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 5), 0);
        assert_eq!(reflect(-2, 5), 1);
        assert_eq!(reflect(5, 5), 4);
        assert_eq!(reflect(6, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        // degenerate single-cell grid
        assert_eq!(reflect(-2, 1), 0);
        assert_eq!(reflect(2, 1), 0);
    }

    #[test]
    fn test_mass_is_preserved() {
        let map = SpatialMap::default();
        let centroids = [
            Centroid::new(10.0, 10.0),
            Centroid::new(250.0, 250.0),
            Centroid::new(499.0, 1.0),
        ];
        let summary = map.compute(&centroids, shape()).unwrap();
        let total: f64 = summary.grid.iter().flatten().sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_person_in_centre() {
        let map = SpatialMap::default();
        let summary = map.compute(&[Centroid::new(250.0, 250.0)], shape()).unwrap();

        // centre weight squared
        let expected = 0.786_570_7_f64.powi(2);
        assert!((summary.grid[2][2] - expected).abs() < 1e-5);
        assert_eq!(summary.hot_cells, 1);
        assert_eq!(summary.max_local_density, summary.grid[2][2]);
    }

    #[test]
    fn test_cluster_and_clamping() {
        let map = SpatialMap::default();
        // out-of-frame coordinates land in the edge cells
        let centroids = [
            Centroid::new(-40.0, -40.0),
            Centroid::new(0.0, 0.0),
            Centroid::new(20.0, 30.0),
            Centroid::new(900.0, 900.0),
        ];
        let summary = map.compute(&centroids, shape()).unwrap();
        assert!(summary.grid[0][0] > 2.0);
        assert!(summary.grid[4][4] > 0.5);
        assert_eq!(summary.hot_cells, 2);
    }

    #[test]
    fn test_empty_frame() {
        let summary = SpatialMap::default().compute(&[], shape()).unwrap();
        assert_eq!(summary.hot_cells, 0);
        assert_eq!(summary.max_local_density, 0.0);
        assert_eq!(summary.grid.len(), 5);
    }

    #[test]
    fn test_invalid_shape() {
        let err = SpatialMap::default()
            .compute(&[Centroid::new(1.0, 1.0)], ImageShape::new(0, 10))
            .unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InvalidShape {
                height: 0,
                width: 10
            }
        );
    }
}
