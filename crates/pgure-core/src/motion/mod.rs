mod block_match;

pub use block_match::BlockMatcher;

use ndarray::{Array4, ArrayView3};

/// Per-patch displacements across a window.
///
/// Patch origins lie on a regular grid in the reference frame (the target
/// frame of the window). For every origin and every frame of the window the
/// field records where the best-matching patch sits in that frame.
#[derive(Clone, Debug)]
pub struct MotionField {
    patch_size: usize,
    reference: usize,
    height: usize,
    width: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    /// Shape `(frames, rows, cols, 2)`, last axis is `(dy, dx)`.
    displacements: Array4<isize>,
}

impl MotionField {
    /// Zero-motion field over a `(frames, height, width)` window.
    pub fn stationary(
        frames: usize,
        height: usize,
        width: usize,
        patch_size: usize,
        step: usize,
        reference: usize,
    ) -> Self {
        let rows = grid_positions(height, patch_size, step);
        let cols = grid_positions(width, patch_size, step);
        let displacements = Array4::zeros((frames, rows.len(), cols.len(), 2));
        Self {
            patch_size,
            reference,
            height,
            width,
            rows,
            cols,
            displacements,
        }
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Index of the reference frame inside the window.
    pub fn reference(&self) -> usize {
        self.reference
    }

    pub fn frames(&self) -> usize {
        self.displacements.shape()[0]
    }

    /// Grid rows and columns of patch origins in the reference frame.
    pub fn grid(&self) -> (&[usize], &[usize]) {
        (&self.rows, &self.cols)
    }

    pub(crate) fn set(&mut self, frame: usize, gi: usize, gj: usize, dy: isize, dx: isize) {
        self.displacements[[frame, gi, gj, 0]] = dy;
        self.displacements[[frame, gi, gj, 1]] = dx;
    }

    /// Displacement of grid cell `(gi, gj)` in `frame`.
    pub fn displacement(&self, frame: usize, gi: usize, gj: usize) -> (isize, isize) {
        (
            self.displacements[[frame, gi, gj, 0]],
            self.displacements[[frame, gi, gj, 1]],
        )
    }

    /// Matched patch origin in `frame` for a reference origin `(row, col)`.
    ///
    /// Origins that are not on the grid use the displacement of the grid
    /// cell containing them. The result is clamped so the patch of size
    /// `patch` stays inside the frame.
    pub fn matched_origin(
        &self,
        frame: usize,
        row: usize,
        col: usize,
        patch: usize,
    ) -> (usize, usize) {
        if self.rows.is_empty() || self.cols.is_empty() {
            return (row, col);
        }
        let gi = self.rows.partition_point(|&r| r <= row).saturating_sub(1);
        let gj = self.cols.partition_point(|&c| c <= col).saturating_sub(1);
        let (dy, dx) = self.displacement(frame, gi, gj);
        let max_row = self.height.saturating_sub(patch) as isize;
        let max_col = self.width.saturating_sub(patch) as isize;
        (
            (row as isize + dy).clamp(0, max_row) as usize,
            (col as isize + dx).clamp(0, max_col) as usize,
        )
    }
}

/// Patch origins `0, step, 2*step, ...` along an axis of length `extent`,
/// always ending with `extent - patch` so the whole axis is covered.
pub fn grid_positions(extent: usize, patch: usize, step: usize) -> Vec<usize> {
    if patch == 0 || patch > extent {
        return Vec::new();
    }
    let last = extent - patch;
    let mut positions: Vec<usize> = (0..=last).step_by(step.max(1)).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

/// Estimates patch motion across a normalized, median-filtered window.
pub trait MotionEstimator: Send + Sync {
    /// `target_index` and `num_frames` locate the window in the full
    /// sequence; `half_window` is `floor(T / 2)`. `search_budget` bounds the
    /// search per frame step.
    fn estimate(
        &self,
        window: ArrayView3<'_, f64>,
        target_index: usize,
        half_window: usize,
        num_frames: usize,
        patch_size: usize,
        search_budget: usize,
    ) -> MotionField;
}
