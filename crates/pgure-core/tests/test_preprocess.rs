#[allow(dead_code)]
mod common;

use std::sync::Arc;

use ndarray::{Array2, Array3};

use pgure_core::filters::{HotPixelCorrector, MadHotPixelCorrector, MedianFilter, WindowMedianFilter};
use pgure_core::frame::Sequence;
use pgure_core::parallel::ParallelExecutor;
use pgure_core::pipeline::config::{DenoiseConfig, PreprocessConfig};
use pgure_core::pipeline::{preprocess, Collaborators, NoOpReporter, ProgressReporter};

use common::Lcg;

fn noisy_flat(frames: usize, h: usize, w: usize, level: f64, sigma: f64, seed: u64) -> Array3<f64> {
    let mut rng = Lcg::new(seed);
    Array3::from_shape_fn((frames, h, w), |_| level + sigma * rng.normal())
}

// ---------------------------------------------------------------------------
// Median filter
// ---------------------------------------------------------------------------

#[test]
fn test_median_removes_isolated_spike() {
    let mut frame = Array2::from_elem((9, 9), 10.0);
    frame[[4, 4]] = 500.0;
    let out = WindowMedianFilter::new(3).filter(frame.view());
    assert_eq!(out.dim(), (9, 9));
    assert!(out.iter().all(|&v| v == 10.0));
}

#[test]
fn test_median_replicates_borders() {
    // Left column 0, rest 1: a 3x3 window at the left edge sees two zero
    // columns (replicated) and one column of ones.
    let frame = Array2::from_shape_fn((5, 5), |(_, c)| if c == 0 { 0.0 } else { 1.0 });
    let out = WindowMedianFilter::new(3).filter(frame.view());
    assert_eq!(out[[2, 0]], 0.0);
    assert_eq!(out[[2, 1]], 1.0);
}

#[test]
fn test_median_size_one_is_identity() {
    let frame = Array2::from_shape_fn((4, 6), |(r, c)| (r * 6 + c) as f64);
    assert_eq!(WindowMedianFilter::new(1).filter(frame.view()), frame);
}

#[test]
fn test_median_large_frame_matches_small_band() {
    // Above the row-parallel threshold, the result must not depend on the band size.
    let data = noisy_flat(1, 300, 260, 50.0, 5.0, 3);
    let frame = data.index_axis(ndarray::Axis(0), 0);
    let wide = WindowMedianFilter::new(5).filter(frame);
    let narrow = WindowMedianFilter {
        window_size: 5,
        cache_budget: 1,
    }
    .filter(frame);
    assert_eq!(wide, narrow);
}

// ---------------------------------------------------------------------------
// Hot pixel correction
// ---------------------------------------------------------------------------

#[test]
fn test_hot_pixel_replaced_by_neighbourhood_median() {
    let mut data = noisy_flat(2, 16, 16, 100.0, 2.0, 11);
    data[[1, 7, 9]] = 4000.0;
    let mut seq = Sequence::from_array(data.clone()).unwrap();
    let replaced = MadHotPixelCorrector.correct(&mut seq, 10.0);
    assert!(replaced >= 1);
    let fixed = seq.data[[1, 7, 9]];
    assert!((fixed - 100.0).abs() < 10.0, "fixed = {fixed}");
    // Ordinary noise is left alone at 10 sigma.
    assert_eq!(seq.data[[0, 3, 3]], data[[0, 3, 3]]);
}

#[test]
fn test_hot_pixel_disabled_by_non_positive_threshold() {
    let mut data = noisy_flat(1, 8, 8, 100.0, 2.0, 5);
    data[[0, 4, 4]] = 4000.0;
    let mut seq = Sequence::from_array(data.clone()).unwrap();
    assert_eq!(MadHotPixelCorrector.correct(&mut seq, 0.0), 0);
    assert_eq!(MadHotPixelCorrector.correct(&mut seq, -1.0), 0);
    assert_eq!(seq.data, data);
}

// ---------------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------------

#[test]
fn test_preprocess_leaves_input_untouched() {
    let mut data = noisy_flat(4, 12, 12, 80.0, 1.0, 21);
    data[[2, 5, 5]] = 3000.0;
    let input = Sequence::from_array(data).unwrap();
    let snapshot = input.clone();

    let config = PreprocessConfig {
        median_size: 3,
        ..PreprocessConfig::default()
    };
    let collaborators = Collaborators::from_config(&DenoiseConfig {
        preprocess: config.clone(),
        ..DenoiseConfig::default()
    });
    let reporter: Arc<dyn ProgressReporter> = Arc::new(NoOpReporter);
    let out = preprocess(&input, &config, &collaborators, &ParallelExecutor::new(2), &reporter)
        .unwrap();

    assert_eq!(input, snapshot);
    assert_eq!(out.raw.shape(), input.shape());
    assert_eq!(out.filtered.shape(), input.shape());
    assert!(out.hot_pixels >= 1);
    assert!(out.raw.data[[2, 5, 5]] < 200.0);
    // Filtered frames come from the raw input, independently of the hot pixel pass.
    let expected = WindowMedianFilter::new(3).filter(input.frame(2));
    assert_eq!(out.filtered.frame(2), expected);
}

#[test]
fn test_preprocess_same_result_for_any_thread_count() {
    let input = Sequence::from_array(noisy_flat(6, 10, 10, 60.0, 3.0, 8)).unwrap();
    let config = PreprocessConfig::default();
    let collaborators = Collaborators::default();
    let reporter: Arc<dyn ProgressReporter> = Arc::new(NoOpReporter);
    let one = preprocess(&input, &config, &collaborators, &ParallelExecutor::new(1), &reporter)
        .unwrap();
    let four = preprocess(&input, &config, &collaborators, &ParallelExecutor::new(4), &reporter)
        .unwrap();
    assert_eq!(one.raw, four.raw);
    assert_eq!(one.filtered, four.filtered);
    assert_eq!(one.hot_pixels, four.hot_pixels);
}
