use ndarray::Array3;

use pgure_core::pipeline::{normalize, window_for, WindowPlacement};

fn placement(start: usize, local_index: usize) -> WindowPlacement {
    WindowPlacement { start, local_index }
}

#[test]
fn test_ten_frames_window_five() {
    let cases = [
        (0, placement(0, 0)),
        (1, placement(0, 1)),
        (2, placement(0, 2)),
        (3, placement(1, 2)),
        (6, placement(4, 2)),
        (7, placement(5, 2)),
        (8, placement(5, 3)),
        (9, placement(5, 4)),
    ];
    for (t, expected) in cases {
        assert_eq!(window_for(t, 10, 5), expected, "t = {t}");
    }
}

#[test]
fn test_window_always_full_and_contains_target() {
    for num_frames in 1..=20 {
        for window in (1..=num_frames).step_by(2) {
            for t in 0..num_frames {
                let p = window_for(t, num_frames, window);
                assert!(p.local_index < window, "n={num_frames} T={window} t={t}");
                assert!(p.start + window <= num_frames, "n={num_frames} T={window} t={t}");
                assert_eq!(p.start + p.local_index, t);
            }
        }
    }
}

#[test]
fn test_interior_frames_are_centred() {
    for t in 7..13 {
        assert_eq!(window_for(t, 20, 15), placement(t - 7, 7));
    }
}

#[test]
fn test_window_equal_to_sequence() {
    for t in 0..7 {
        assert_eq!(window_for(t, 7, 7), placement(0, t));
    }
}

#[test]
fn test_normalize_negative_max_is_degenerate() {
    let w = Array3::from_elem((2, 3, 3), -4.0);
    let n = normalize(w.view());
    assert!(n.is_degenerate());
    assert_eq!(n.scale, 1.0);
}

#[test]
fn test_normalize_keeps_ratios() {
    let w = Array3::from_shape_fn((3, 4, 4), |(f, r, c)| (f * 16 + r * 4 + c) as f64);
    let n = normalize(w.view());
    assert_eq!(n.scale, 47.0);
    approx::assert_abs_diff_eq!(n.data[[1, 2, 3]], 27.0 / 47.0, epsilon = 1e-15);
    approx::assert_abs_diff_eq!(n.mean(), 23.5 / 47.0, epsilon = 1e-12);
}
