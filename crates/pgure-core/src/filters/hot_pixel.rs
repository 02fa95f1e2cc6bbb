use ndarray::{Array2, ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::consts::{EPSILON, MAD_TO_SIGMA};
use crate::frame::Sequence;

use super::median_in_place;

/// In-place outlier correction over a whole sequence.
pub trait HotPixelCorrector: Send + Sync {
    /// Replace samples flagged as hot pixels. Returns how many were replaced.
    fn correct(&self, sequence: &mut Sequence, threshold: f64) -> usize;
}

/// Median-absolute-deviation hot pixel rejection.
///
/// Each sample is compared with the median of its 3x3 neighbourhood (centre
/// excluded). Residuals are scaled by the frame's robust sigma
/// (`1.4826 * MAD`); samples more than `threshold` sigmas away are replaced
/// by the neighbourhood median. Frames are processed in parallel on the
/// current rayon pool. A non-positive threshold disables correction.
#[derive(Clone, Copy, Debug, Default)]
pub struct MadHotPixelCorrector;

impl HotPixelCorrector for MadHotPixelCorrector {
    fn correct(&self, sequence: &mut Sequence, threshold: f64) -> usize {
        if threshold <= 0.0 || !threshold.is_finite() {
            return 0;
        }
        sequence
            .data
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .map(|frame| correct_frame(frame, threshold))
            .sum()
    }
}

fn correct_frame(mut frame: ArrayViewMut2<'_, f64>, threshold: f64) -> usize {
    let (h, w) = frame.dim();
    if h * w < 2 {
        return 0;
    }

    let mut medians = Array2::<f64>::zeros((h, w));
    let mut neighbours = Vec::with_capacity(8);
    for row in 0..h {
        for col in 0..w {
            neighbours.clear();
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let r = row as isize + dy;
                    let c = col as isize + dx;
                    if r >= 0 && c >= 0 && (r as usize) < h && (c as usize) < w {
                        neighbours.push(frame[[r as usize, c as usize]]);
                    }
                }
            }
            medians[[row, col]] = median_in_place(neighbours.as_mut_slice());
        }
    }

    let residuals: Vec<f64> = frame
        .iter()
        .zip(medians.iter())
        .map(|(v, m)| v - m)
        .collect();
    let Some(scale) = robust_scale(&residuals) else {
        return 0;
    };
    let centre = {
        let mut scratch = residuals.clone();
        median_in_place(scratch.as_mut_slice())
    };

    let limit = threshold * scale;
    let mut replaced = 0;
    for ((value, median), residual) in frame.iter_mut().zip(medians.iter()).zip(&residuals) {
        if (residual - centre).abs() > limit {
            *value = *median;
            replaced += 1;
        }
    }
    replaced
}

/// Robust sigma of the residuals: MAD-based, falling back to the standard
/// deviation when more than half the residuals are identical.
fn robust_scale(residuals: &[f64]) -> Option<f64> {
    let mut scratch = residuals.to_vec();
    let centre = median_in_place(scratch.as_mut_slice());
    let mut deviations: Vec<f64> = residuals.iter().map(|r| (r - centre).abs()).collect();
    let mad = median_in_place(deviations.as_mut_slice()) * MAD_TO_SIGMA;
    if mad > EPSILON {
        return Some(mad);
    }

    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let var = residuals.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    let std = var.sqrt();
    (std > EPSILON).then_some(std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robust_scale_flat_is_none() {
        assert!(robust_scale(&[0.0; 16]).is_none());
    }

    #[test]
    fn test_robust_scale_sparse_spike_falls_back_to_std() {
        let mut r = vec![0.0; 100];
        r[10] = 1.0;
        let s = robust_scale(&r).unwrap();
        assert!((s - (0.01f64 - 0.0001).sqrt()).abs() < 1e-9);
    }
}
