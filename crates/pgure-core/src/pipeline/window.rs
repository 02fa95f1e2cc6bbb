use ndarray::{Array3, ArrayView3};

/// Where the window for a target frame sits in the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlacement {
    /// First frame of the window.
    pub start: usize,
    /// Position of the target frame inside the window.
    pub local_index: usize,
}

/// Select the `window_length` frames used to denoise `target`.
///
/// The window is centred on the target and shifted inward near either end
/// of the sequence so it always holds exactly `window_length` frames.
/// Requires `window_length <= num_frames`.
pub fn window_for(target: usize, num_frames: usize, window_length: usize) -> WindowPlacement {
    let half = window_length / 2;
    let start = if target < half {
        0
    } else if target >= num_frames.saturating_sub(half) {
        num_frames.saturating_sub(window_length)
    } else {
        target - half
    };
    WindowPlacement {
        start,
        local_index: target - start,
    }
}

/// A window scaled by the reciprocal of its own maximum.
#[derive(Clone, Debug)]
pub struct NormalizedWindow {
    pub data: Array3<f64>,
    /// Factor that undoes the normalization. 1 for a degenerate window.
    pub scale: f64,
    degenerate: bool,
}

impl NormalizedWindow {
    /// `true` when the maximum was not a positive finite number, in which
    /// case `data` is an unscaled copy.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn mean(&self) -> f64 {
        self.data.mean().unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.data.fold(f64::NEG_INFINITY, |m, &v| m.max(v))
    }
}

pub fn normalize(window: ArrayView3<'_, f64>) -> NormalizedWindow {
    let peak = window.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    if peak > 0.0 && peak.is_finite() {
        NormalizedWindow {
            data: window.mapv(|v| v / peak),
            scale: peak,
            degenerate: false,
        }
    } else {
        NormalizedWindow {
            data: window.to_owned(),
            scale: 1.0,
            degenerate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame_window() {
        assert_eq!(
            window_for(0, 1, 1),
            WindowPlacement {
                start: 0,
                local_index: 0
            }
        );
    }

    #[test]
    fn test_normalize_all_zero_is_noop() {
        let w = Array3::<f64>::zeros((3, 2, 2));
        let n = normalize(w.view());
        assert!(n.is_degenerate());
        assert_eq!(n.scale, 1.0);
        assert_eq!(n.data, w);
    }

    #[test]
    fn test_normalize_scales_to_unit_max() {
        let w = Array3::from_shape_fn((1, 2, 2), |(_, r, c)| (r * 2 + c) as f64);
        let n = normalize(w.view());
        assert!(!n.is_degenerate());
        assert_eq!(n.scale, 3.0);
        assert_eq!(n.max(), 1.0);
    }
}
