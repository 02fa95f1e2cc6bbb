use ndarray::{s, ArrayView2, ArrayView3, Axis};

use crate::consts::DEFAULT_PATCH_OVERLAP;
use crate::pipeline::window_for;

use super::{MotionEstimator, MotionField};

/// Exhaustive sum-of-absolute-differences block matching.
///
/// Each reference patch is tracked outward from the reference frame, one
/// frame at a time. The search in frame `f` is centred on the match found
/// in the neighbouring frame closer to the reference and covers a square
/// of radius `search_budget`; candidates are always compared against the
/// reference patch itself, so tracking does not drift. Ties go to the
/// smaller displacement.
#[derive(Clone, Debug)]
pub struct BlockMatcher {
    /// Step between neighbouring patch origins on the reference grid.
    pub step: usize,
}

impl BlockMatcher {
    pub fn new(step: usize) -> Self {
        Self { step: step.max(1) }
    }
}

impl Default for BlockMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PATCH_OVERLAP)
    }
}

impl MotionEstimator for BlockMatcher {
    fn estimate(
        &self,
        window: ArrayView3<'_, f64>,
        target_index: usize,
        half_window: usize,
        num_frames: usize,
        patch_size: usize,
        search_budget: usize,
    ) -> MotionField {
        let (frames, h, w) = window.dim();
        debug_assert_eq!(frames, 2 * half_window + 1);
        let local = if frames == 0 {
            0
        } else {
            window_for(target_index, num_frames, frames)
                .local_index
                .min(frames - 1)
        };
        let mut field = MotionField::stationary(frames, h, w, patch_size, self.step, local);
        if patch_size == 0 || search_budget == 0 || frames < 2 {
            return field;
        }

        let (rows, cols) = field.grid();
        let (rows, cols) = (rows.to_vec(), cols.to_vec());
        let radius = search_budget as isize;
        for (gi, &r0) in rows.iter().enumerate() {
            for (gj, &c0) in cols.iter().enumerate() {
                let reference =
                    window.slice(s![local, r0..r0 + patch_size, c0..c0 + patch_size]);

                let mut shift = (0isize, 0isize);
                for f in local + 1..frames {
                    let frame = window.index_axis(Axis(0), f);
                    shift = best_match(frame, &reference, (r0, c0), shift, radius);
                    field.set(f, gi, gj, shift.0, shift.1);
                }

                let mut shift = (0isize, 0isize);
                for f in (0..local).rev() {
                    let frame = window.index_axis(Axis(0), f);
                    shift = best_match(frame, &reference, (r0, c0), shift, radius);
                    field.set(f, gi, gj, shift.0, shift.1);
                }
            }
        }
        field
    }
}

fn best_match(
    frame: ArrayView2<'_, f64>,
    reference: &ArrayView2<'_, f64>,
    origin: (usize, usize),
    centre: (isize, isize),
    radius: isize,
) -> (isize, isize) {
    let (h, w) = frame.dim();
    let (ph, pw) = reference.dim();
    let max_row = (h - ph) as isize;
    let max_col = (w - pw) as isize;
    let (r0, c0) = (origin.0 as isize, origin.1 as isize);

    let mut best = centre;
    let mut best_cost = sad(&frame, reference, r0 + centre.0, c0 + centre.1, f64::INFINITY);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let candidate = (centre.0 + dy, centre.1 + dx);
            let (r, c) = (r0 + candidate.0, c0 + candidate.1);
            if r < 0 || c < 0 || r > max_row || c > max_col || candidate == centre {
                continue;
            }
            let cost = sad(&frame, reference, r, c, best_cost);
            let shorter = candidate.0.abs() + candidate.1.abs() < best.0.abs() + best.1.abs();
            if cost < best_cost || (cost == best_cost && shorter) {
                best = candidate;
                best_cost = cost;
            }
        }
    }
    best
}

/// Sum of absolute differences, abandoned early once it exceeds `limit`.
fn sad(
    frame: &ArrayView2<'_, f64>,
    reference: &ArrayView2<'_, f64>,
    row: isize,
    col: isize,
    limit: f64,
) -> f64 {
    let (row, col) = (row as usize, col as usize);
    let mut total = 0.0;
    for ((r, c), &v) in reference.indexed_iter() {
        total += (frame[[row + r, col + c]] - v).abs();
        if total > limit {
            break;
        }
    }
    total
}
