use crate::filters::{HotPixelCorrector, MadHotPixelCorrector, MedianFilter, WindowMedianFilter};
use crate::motion::{BlockMatcher, MotionEstimator};
use crate::noise::{BinnedNoiseEstimator, NoiseEstimator};
use crate::svt::{SvtOptimizer, ThresholdOptimizer};

use super::config::DenoiseConfig;

/// The filters and estimators a run delegates to.
///
/// Any of them can be swapped for a custom implementation before calling
/// [`denoise_sequence_reported`](super::denoise_sequence_reported).
pub struct Collaborators {
    pub median: Box<dyn MedianFilter>,
    pub hot_pixel: Box<dyn HotPixelCorrector>,
    pub noise: Box<dyn NoiseEstimator>,
    pub motion: Box<dyn MotionEstimator>,
    pub optimizer: Box<dyn ThresholdOptimizer>,
}

impl Collaborators {
    /// Default implementations, parameterized from `config`.
    pub fn from_config(config: &DenoiseConfig) -> Self {
        let median = WindowMedianFilter {
            window_size: config.preprocess.median_size,
            cache_budget: config.preprocess.cache_budget,
        };
        Self {
            median: Box::new(median),
            hot_pixel: Box::new(MadHotPixelCorrector),
            noise: Box::new(BinnedNoiseEstimator::default()),
            motion: Box::new(BlockMatcher::new(config.patch.overlap)),
            optimizer: Box::new(SvtOptimizer),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::from_config(&DenoiseConfig::default())
    }
}
