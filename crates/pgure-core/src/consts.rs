/// Minimum pixel count (h*w) to use row-level Rayon parallelism inside a frame.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Default executor threshold: ranges at or below this size run inline.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1;

/// Hard cap on risk evaluations per frame in adaptive mode.
pub const DEFAULT_MAX_EVALUATIONS: usize = 1000;

/// Default relative tolerance of the lambda search.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Default temporal window length (frames). Must be odd.
pub const DEFAULT_WINDOW_LENGTH: usize = 15;

/// Default spatial patch edge length in pixels.
pub const DEFAULT_PATCH_SIZE: usize = 4;

/// Default step between neighbouring patch origins (1 = maximal overlap).
pub const DEFAULT_PATCH_OVERLAP: usize = 1;

/// Default block-matching search radius in pixels.
pub const DEFAULT_MOTION_SEARCH: usize = 11;

/// Default median filter window edge length. Must be odd.
pub const DEFAULT_MEDIAN_SIZE: usize = 5;

/// L2 cache size hint for the median filter, in bytes.
pub const DEFAULT_MEDIAN_CACHE_BUDGET: usize = 512 * 1024;

/// Default hot-pixel threshold, in robust standard deviations.
pub const DEFAULT_HOT_PIXEL_THRESHOLD: f64 = 10.0;

/// Number of intensity bins used by the noise estimator.
pub const DEFAULT_NOISE_BINS: usize = 4;

/// Scale factor turning a median absolute deviation into a Gaussian sigma.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;

/// Sweeps of the cyclic Jacobi eigen solver before giving up on convergence.
pub const JACOBI_MAX_SWEEPS: usize = 64;

/// Golden ratio conjugate used by the lambda line search.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_8;
