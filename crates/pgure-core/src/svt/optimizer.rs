use ndarray::{s, Array2, Array3, ArrayView3, Zip};
use tracing::trace;

use crate::motion::{grid_positions, MotionField};
use crate::noise::NoiseParams;

use super::decompose::GramSvd;
use super::risk::{patch_risk, soft_threshold};
use super::search::minimize_scalar;
use super::{LambdaSearch, ThresholdOptimizer, ThresholdSession};

/// Patch-wise singular value thresholding with a Stein risk objective.
///
/// Every patch origin on the reference grid becomes a Casorati matrix whose
/// columns are the motion-matched patches of each frame. Thresholding a
/// matrix shrinks its singular values by lambda; the reconstruction averages
/// all overlapping patch estimates. The risk sums the per-patch Stein
/// estimate under the Poisson-Gaussian variance at the patch's mean level.
#[derive(Clone, Copy, Debug, Default)]
pub struct SvtOptimizer;

impl ThresholdOptimizer for SvtOptimizer {
    fn initialize(
        &self,
        window: ArrayView3<'_, f64>,
        motion: &MotionField,
        patch_size: usize,
        patch_overlap: usize,
        noise: &NoiseParams,
    ) -> Box<dyn ThresholdSession> {
        Box::new(SvtSession::new(window, motion, patch_size, patch_overlap, noise))
    }
}

struct PatchStack {
    /// Patch origin in each frame of the window.
    origins: Vec<(usize, usize)>,
    singular_values: Vec<f64>,
    variance: f64,
}

/// Prepared thresholding problem for one window.
pub struct SvtSession {
    window: Array3<f64>,
    patch_size: usize,
    patches: Vec<PatchStack>,
}

impl SvtSession {
    pub fn new(
        window: ArrayView3<'_, f64>,
        motion: &MotionField,
        patch_size: usize,
        step: usize,
        noise: &NoiseParams,
    ) -> Self {
        let window = window.to_owned();
        let (frames, h, w) = window.dim();
        let rows = grid_positions(h, patch_size, step);
        let cols = grid_positions(w, patch_size, step);
        let tracked = motion.frames() == frames;

        let mut patches = Vec::with_capacity(rows.len() * cols.len());
        for &r in &rows {
            for &c in &cols {
                let origins: Vec<(usize, usize)> = (0..frames)
                    .map(|f| {
                        if tracked && f != motion.reference() {
                            motion.matched_origin(f, r, c, patch_size)
                        } else {
                            (r, c)
                        }
                    })
                    .collect();
                let casorati = casorati(&window, patch_size, &origins);
                let mean = casorati.mean().unwrap_or(0.0);
                let svd = GramSvd::compute(casorati.view());
                patches.push(PatchStack {
                    origins,
                    singular_values: svd.singular_values,
                    variance: noise.variance_at(mean),
                });
            }
        }
        trace!(patches = patches.len(), "SVT session initialised");

        Self {
            window,
            patch_size,
            patches,
        }
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Summed Stein risk of thresholding every patch at `lambda`.
    pub fn risk(&self, lambda: f64) -> f64 {
        let rows = self.patch_size * self.patch_size;
        self.patches
            .iter()
            .map(|p| patch_risk(&p.singular_values, lambda, rows, p.origins.len(), p.variance))
            .sum()
    }
}

impl ThresholdSession for SvtSession {
    fn optimize(
        &mut self,
        tolerance: f64,
        initial_lambda: f64,
        max_value: f64,
        max_evaluations: usize,
    ) -> LambdaSearch {
        minimize_scalar(
            |lambda| self.risk(lambda),
            initial_lambda,
            0.0,
            max_value,
            tolerance,
            max_evaluations,
        )
    }

    fn reconstruct(&self, lambda: f64) -> Array3<f64> {
        let p = self.patch_size;
        let mut sum = Array3::<f64>::zeros(self.window.dim());
        let mut weight = Array3::<f64>::zeros(self.window.dim());

        for patch in &self.patches {
            let m = casorati(&self.window, p, &patch.origins);
            let svd = GramSvd::compute(m.view());
            let rebuilt = svd.rebuild(m.view(), |s| soft_threshold(s, lambda));
            for (f, &(r, c)) in patch.origins.iter().enumerate() {
                let mut block = sum.slice_mut(s![f, r..r + p, c..c + p]);
                for (k, v) in block.iter_mut().enumerate() {
                    *v += rebuilt[[k, f]];
                }
                weight
                    .slice_mut(s![f, r..r + p, c..c + p])
                    .mapv_inplace(|w| w + 1.0);
            }
        }

        Zip::from(&mut sum)
            .and(&weight)
            .and(&self.window)
            .for_each(|out, &w, &original| {
                *out = if w > 0.0 { *out / w } else { original };
            });
        sum
    }
}

/// Stack the patch at `origins[f]` of every frame `f` as column `f`.
fn casorati(window: &Array3<f64>, patch: usize, origins: &[(usize, usize)]) -> Array2<f64> {
    let mut m = Array2::<f64>::zeros((patch * patch, origins.len()));
    for (f, &(r, c)) in origins.iter().enumerate() {
        let block = window.slice(s![f, r..r + patch, c..c + patch]);
        for (k, v) in block.iter().enumerate() {
            m[[k, f]] = *v;
        }
    }
    m
}
