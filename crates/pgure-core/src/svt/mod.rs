mod decompose;
mod optimizer;
pub mod risk;
mod search;

pub use decompose::{symmetric_eigen, GramSvd};
pub use optimizer::{SvtOptimizer, SvtSession};
pub use search::minimize_scalar;

use ndarray::{Array3, ArrayView3};

use crate::motion::MotionField;
use crate::noise::NoiseParams;

/// Outcome of a lambda search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LambdaSearch {
    pub lambda: f64,
    /// Risk evaluations spent.
    pub evaluations: usize,
    /// `false` when the evaluation cap was reached before the tolerance.
    pub converged: bool,
}

/// A window prepared for thresholding.
pub trait ThresholdSession: Send {
    /// Search `[0, max_value]` for the lambda minimising the risk, starting
    /// at `initial_lambda`. A zero `max_evaluations` returns the initial
    /// guess without evaluating anything.
    fn optimize(
        &mut self,
        tolerance: f64,
        initial_lambda: f64,
        max_value: f64,
        max_evaluations: usize,
    ) -> LambdaSearch;

    /// Denoised window at `lambda`, same shape as the input window.
    fn reconstruct(&self, lambda: f64) -> Array3<f64>;
}

/// Builds a [`ThresholdSession`] for one window.
pub trait ThresholdOptimizer: Send + Sync {
    fn initialize(
        &self,
        window: ArrayView3<'_, f64>,
        motion: &MotionField,
        patch_size: usize,
        patch_overlap: usize,
        noise: &NoiseParams,
    ) -> Box<dyn ThresholdSession>;
}
