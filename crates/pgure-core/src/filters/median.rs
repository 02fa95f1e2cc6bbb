use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::{DEFAULT_MEDIAN_CACHE_BUDGET, DEFAULT_MEDIAN_SIZE, PARALLEL_PIXEL_THRESHOLD};

use super::median_in_place;

/// Spatial median filter applied to a single frame.
pub trait MedianFilter: Send + Sync {
    /// Return the filtered copy of `frame`. Output has the same dimensions.
    fn filter(&self, frame: ArrayView2<'_, f64>) -> Array2<f64>;
}

/// Square-window median filter with replicated borders.
///
/// `cache_budget` is a working-set hint in bytes: rows are handed to worker
/// threads in bands whose source footprint fits the budget.
#[derive(Clone, Debug)]
pub struct WindowMedianFilter {
    pub window_size: usize,
    pub cache_budget: usize,
}

impl WindowMedianFilter {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            cache_budget: DEFAULT_MEDIAN_CACHE_BUDGET,
        }
    }

    fn band_rows(&self, width: usize) -> usize {
        let per_row = width * self.window_size.max(1) * std::mem::size_of::<f64>();
        (self.cache_budget / per_row.max(1)).max(1)
    }
}

impl Default for WindowMedianFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIAN_SIZE)
    }
}

impl MedianFilter for WindowMedianFilter {
    fn filter(&self, frame: ArrayView2<'_, f64>) -> Array2<f64> {
        let (h, w) = frame.dim();
        if self.window_size <= 1 || h == 0 || w == 0 {
            return frame.to_owned();
        }
        let radius = self.window_size / 2;

        if h * w >= PARALLEL_PIXEL_THRESHOLD {
            let rows: Vec<Vec<f64>> = (0..h)
                .into_par_iter()
                .with_min_len(self.band_rows(w))
                .map(|row| {
                    let mut window = Vec::with_capacity(self.window_size * self.window_size);
                    (0..w)
                        .map(|col| median_at(&frame, row, col, radius, &mut window))
                        .collect()
                })
                .collect();

            let mut result = Array2::<f64>::zeros((h, w));
            for (row, row_data) in rows.into_iter().enumerate() {
                for (col, val) in row_data.into_iter().enumerate() {
                    result[[row, col]] = val;
                }
            }
            result
        } else {
            let mut result = Array2::<f64>::zeros((h, w));
            let mut window = Vec::with_capacity(self.window_size * self.window_size);
            for row in 0..h {
                for col in 0..w {
                    result[[row, col]] = median_at(&frame, row, col, radius, &mut window);
                }
            }
            result
        }
    }
}

fn median_at(
    frame: &ArrayView2<'_, f64>,
    row: usize,
    col: usize,
    radius: usize,
    window: &mut Vec<f64>,
) -> f64 {
    let (h, w) = frame.dim();
    window.clear();
    for dy in 0..=2 * radius {
        let src_row = (row as isize + dy as isize - radius as isize).clamp(0, h as isize - 1) as usize;
        for dx in 0..=2 * radius {
            let src_col =
                (col as isize + dx as isize - radius as isize).clamp(0, w as isize - 1) as usize;
            window.push(frame[[src_row, src_col]]);
        }
    }
    median_in_place(window.as_mut_slice())
}
