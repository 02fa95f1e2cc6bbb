use ndarray::{ArrayView2, ArrayView3, Axis};
use tracing::debug;

use crate::consts::EPSILON;
use crate::filters::median_in_place;

use super::{NoiseEstimator, NoiseMethod, NoiseParams};

/// Variance-versus-intensity regression over small blocks.
///
/// For every `block_size` x `block_size` block the estimator records the
/// block's mean intensity and the variance of a high-pass residual (sample
/// minus the mean of its eight neighbours, rescaled to the sample variance).
/// Pairs are sorted by intensity into equally populated bins, each bin is
/// summarised according to [`NoiseMethod`], and a line
/// `variance = gain * mean + (sigma^2 - gain * offset)` is fitted through the
/// bin summaries. The configured offset is kept; gain and sigma are updated.
#[derive(Clone, Debug)]
pub struct BinnedNoiseEstimator {
    pub block_size: usize,
}

impl Default for BinnedNoiseEstimator {
    fn default() -> Self {
        Self { block_size: 4 }
    }
}

/// Residual of `x - mean(8 neighbours)` has variance `9/8` of the noise.
const NEIGHBOUR_RESIDUAL_SCALE: f64 = 8.0 / 9.0;

impl NoiseEstimator for BinnedNoiseEstimator {
    fn estimate(
        &self,
        window: ArrayView3<'_, f64>,
        params: &mut NoiseParams,
        num_bins: usize,
        method: NoiseMethod,
    ) {
        let num_bins = num_bins.max(2);
        let mut samples = Vec::new();
        for frame in window.axis_iter(Axis(0)) {
            block_statistics(frame, self.block_size.max(2), &mut samples);
        }
        if samples.len() < num_bins * 2 {
            debug!(blocks = samples.len(), "Too few blocks for noise estimation");
            return;
        }

        let bins = summarise_bins(&mut samples, num_bins, method);
        let Some((slope, intercept)) = fit_line(&bins) else {
            debug!("Degenerate intensity spread, keeping noise parameters");
            return;
        };

        let gain = slope.max(0.0);
        let sigma_sq = intercept + gain * params.offset;
        params.gain = gain;
        params.sigma = sigma_sq.max(0.0).sqrt();
        debug!(
            gain = params.gain,
            offset = params.offset,
            sigma = params.sigma,
            "Noise parameters estimated"
        );
    }
}

fn block_statistics(frame: ArrayView2<'_, f64>, block: usize, out: &mut Vec<(f64, f64)>) {
    let (h, w) = frame.dim();
    if h < block + 2 || w < block + 2 {
        return;
    }
    let mut residuals = Vec::with_capacity(block * block);
    let mut row = 1;
    while row + block < h {
        let mut col = 1;
        while col + block < w {
            residuals.clear();
            let mut sum = 0.0;
            for r in row..row + block {
                for c in col..col + block {
                    let centre = frame[[r, c]];
                    let mut neighbours = 0.0;
                    for dr in 0..3 {
                        for dc in 0..3 {
                            if dr != 1 || dc != 1 {
                                neighbours += frame[[r + dr - 1, c + dc - 1]];
                            }
                        }
                    }
                    residuals.push(centre - neighbours / 8.0);
                    sum += centre;
                }
            }
            let n = residuals.len() as f64;
            let mean_res = residuals.iter().sum::<f64>() / n;
            let var = residuals
                .iter()
                .map(|e| (e - mean_res) * (e - mean_res))
                .sum::<f64>()
                / (n - 1.0);
            out.push((sum / n, var * NEIGHBOUR_RESIDUAL_SCALE));
            col += block;
        }
        row += block;
    }
}

fn summarise_bins(
    samples: &mut [(f64, f64)],
    num_bins: usize,
    method: NoiseMethod,
) -> Vec<(f64, f64)> {
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    let per_bin = samples.len().div_ceil(num_bins);
    samples
        .chunks(per_bin)
        .map(|chunk| {
            let n = chunk.len() as f64;
            let mean = chunk.iter().map(|(m, _)| m).sum::<f64>() / n;
            let variance = match method {
                NoiseMethod::LeastSquares => chunk.iter().map(|(_, v)| v).sum::<f64>() / n,
                NoiseMethod::Robust => {
                    let mut vars: Vec<f64> = chunk.iter().map(|(_, v)| *v).collect();
                    median_in_place(vars.as_mut_slice())
                }
            };
            (mean, variance)
        })
        .collect()
}

/// Ordinary least squares through `(x, y)` points. `None` if x has no spread.
fn fit_line(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x) * (x - mean_x)).sum();
    if sxx < EPSILON {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}
