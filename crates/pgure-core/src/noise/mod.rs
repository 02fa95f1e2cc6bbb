mod binned;

pub use binned::BinnedNoiseEstimator;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

/// Mixed Poisson-Gaussian noise model.
///
/// A sample with expected value `x` has variance
/// `gain * (x - offset) + sigma^2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub gain: f64,
    pub offset: f64,
    pub sigma: f64,
}

impl NoiseParams {
    /// Model variance at expected intensity `mean`.
    pub fn variance_at(&self, mean: f64) -> f64 {
        (self.gain * (mean - self.offset).max(0.0) + self.sigma * self.sigma).max(0.0)
    }
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            sigma: 0.0,
        }
    }
}

/// How each intensity bin summarises its local variance samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseMethod {
    /// Arithmetic mean of the variances in the bin.
    LeastSquares,
    /// Median of the variances in the bin; insensitive to edges and texture.
    #[default]
    Robust,
}

impl std::fmt::Display for NoiseMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeastSquares => write!(f, "Least Squares"),
            Self::Robust => write!(f, "Robust"),
        }
    }
}

/// Refines noise-model parameters from a normalized window.
pub trait NoiseEstimator: Send + Sync {
    /// Update `params` in place. Window contents are never modified.
    /// Implementations leave `params` untouched when the window carries too
    /// little information for a fit.
    fn estimate(
        &self,
        window: ArrayView3<'_, f64>,
        params: &mut NoiseParams,
        num_bins: usize,
        method: NoiseMethod,
    );
}
