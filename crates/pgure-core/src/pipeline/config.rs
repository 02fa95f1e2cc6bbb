use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_HOT_PIXEL_THRESHOLD, DEFAULT_MAX_EVALUATIONS, DEFAULT_MEDIAN_CACHE_BUDGET,
    DEFAULT_MEDIAN_SIZE, DEFAULT_MOTION_SEARCH, DEFAULT_NOISE_BINS, DEFAULT_PATCH_OVERLAP,
    DEFAULT_PATCH_SIZE, DEFAULT_TOLERANCE, DEFAULT_WINDOW_LENGTH,
};
use crate::error::{PgureError, Result};
use crate::frame::SequenceShape;
use crate::noise::{NoiseMethod, NoiseParams};
use crate::parallel::hardware_threads;

/// Complete configuration of a denoising run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenoiseConfig {
    /// Temporal window length `T`. Must be odd and no longer than the sequence.
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Worker threads. `None` uses the hardware parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(default)]
    pub patch: PatchConfig,
    #[serde(default)]
    pub threshold: ThresholdMode,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

fn default_window_length() -> usize {
    DEFAULT_WINDOW_LENGTH
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            threads: None,
            patch: PatchConfig::default(),
            threshold: ThresholdMode::default(),
            noise: NoiseConfig::default(),
            motion: MotionConfig::default(),
            preprocess: PreprocessConfig::default(),
        }
    }
}

impl DenoiseConfig {
    /// Worker count after resolving `None` to the hardware parallelism.
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(hardware_threads)
    }

    /// Check the configuration against the sequence it will run on.
    pub fn validate(&self, shape: SequenceShape) -> Result<()> {
        SequenceShape::new(shape.width, shape.height, shape.frames)?;

        let t = self.window_length;
        if t == 0 || t % 2 == 0 {
            return Err(invalid(format!("window length must be odd and positive, got {t}")));
        }
        if t > shape.frames {
            return Err(invalid(format!(
                "window length {t} exceeds the sequence length {}",
                shape.frames
            )));
        }
        if self.threads == Some(0) {
            return Err(invalid("thread count must be at least 1".into()));
        }

        let p = self.patch.size;
        if p == 0 || p > shape.width || p > shape.height {
            return Err(invalid(format!(
                "patch size {p} does not fit a {}x{} frame",
                shape.width, shape.height
            )));
        }
        if self.patch.overlap == 0 {
            return Err(invalid("patch step must be at least 1".into()));
        }

        let m = self.preprocess.median_size;
        if m == 0 || m % 2 == 0 {
            return Err(invalid(format!("median window must be odd and positive, got {m}")));
        }
        if self.preprocess.hot_pixel_threshold.is_nan() {
            return Err(invalid("hot pixel threshold is NaN".into()));
        }

        match self.threshold {
            ThresholdMode::Fixed { lambda } => {
                if !lambda.is_finite() || lambda < 0.0 {
                    return Err(invalid(format!(
                        "fixed lambda must be finite and >= 0, got {lambda}"
                    )));
                }
            }
            ThresholdMode::Adaptive { tolerance, .. } => {
                if !tolerance.is_finite() || tolerance < 0.0 {
                    return Err(invalid(format!(
                        "tolerance must be finite and >= 0, got {tolerance}"
                    )));
                }
            }
        }

        let n = &self.noise;
        if !(n.gain.is_finite() && n.offset.is_finite() && n.sigma.is_finite()) {
            return Err(invalid("noise parameters must be finite".into()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> PgureError {
    PgureError::InvalidConfig(msg)
}

/// Spatial patch geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Patch edge length in pixels.
    pub size: usize,
    /// Step between neighbouring patch origins. 1 gives maximal overlap.
    pub overlap: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_PATCH_SIZE,
            overlap: DEFAULT_PATCH_OVERLAP,
        }
    }
}

/// How each frame's threshold is chosen.
///
/// Lambda is expressed in normalized units: every window is scaled to a
/// maximum of 1 before thresholding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Use the given lambda for every frame.
    Fixed { lambda: f64 },
    /// Minimise the risk estimate per frame.
    ///
    /// With `warm_start` on and more than one worker, a frame's starting
    /// guess depends on whether its predecessor finished first, so results
    /// can differ between runs. Set `warm_start = false` (or use one thread)
    /// for output that is independent of scheduling.
    Adaptive {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_max_evaluations")]
        max_evaluations: usize,
        /// Seed each search with the previous frame's lambda when it is
        /// already known.
        #[serde(default = "default_warm_start")]
        warm_start: bool,
    },
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_evaluations() -> usize {
    DEFAULT_MAX_EVALUATIONS
}

fn default_warm_start() -> bool {
    true
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::Adaptive {
            tolerance: DEFAULT_TOLERANCE,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            warm_start: true,
        }
    }
}

impl ThresholdMode {
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Adaptive { .. })
    }
}

impl std::fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed { lambda } => write!(f, "Fixed (lambda={lambda})"),
            Self::Adaptive { tolerance, .. } => write!(f, "Adaptive (tol={tolerance:e})"),
        }
    }
}

/// Noise model and its per-frame refinement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Refine the model from each window. Only used in adaptive mode.
    pub estimate: bool,
    pub gain: f64,
    pub offset: f64,
    pub sigma: f64,
    pub bins: usize,
    pub method: NoiseMethod,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        let params = NoiseParams::default();
        Self {
            estimate: true,
            gain: params.gain,
            offset: params.offset,
            sigma: params.sigma,
            bins: DEFAULT_NOISE_BINS,
            method: NoiseMethod::default(),
        }
    }
}

impl NoiseConfig {
    /// Starting parameters for every frame.
    pub fn params(&self) -> NoiseParams {
        NoiseParams {
            gain: self.gain,
            offset: self.offset,
            sigma: self.sigma,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Block-matching search radius in pixels. Zero disables motion search.
    pub search_radius: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_MOTION_SEARCH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Odd edge length of the median filter window.
    pub median_size: usize,
    /// Working-set hint for the median filter, in bytes.
    pub cache_budget: usize,
    /// Hot pixel threshold in robust standard deviations. `<= 0` disables.
    pub hot_pixel_threshold: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            median_size: DEFAULT_MEDIAN_SIZE,
            cache_budget: DEFAULT_MEDIAN_CACHE_BUDGET,
            hot_pixel_threshold: DEFAULT_HOT_PIXEL_THRESHOLD,
        }
    }
}
