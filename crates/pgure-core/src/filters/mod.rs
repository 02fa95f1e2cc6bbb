pub mod hot_pixel;
pub mod median;

pub use hot_pixel::{HotPixelCorrector, MadHotPixelCorrector};
pub use median::{MedianFilter, WindowMedianFilter};

use num_traits::Float;

/// Median of `values`, reordering the slice in place.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Returns zero for an empty slice.
pub(crate) fn median_in_place<T: Float>(values: &mut [T]) -> T {
    let n = values.len();
    if n == 0 {
        return T::zero();
    }
    if n == 1 {
        return values[0];
    }
    let cmp = |a: &T, b: &T| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal);
    let mid = n / 2;
    if n % 2 == 1 {
        *values.select_nth_unstable_by(mid, cmp).1
    } else {
        values.select_nth_unstable_by(mid, cmp);
        let upper = values[mid];
        values[..mid].select_nth_unstable_by(mid - 1, cmp);
        (values[mid - 1] + upper) / (T::one() + T::one())
    }
}

#[cfg(test)]
mod tests {
    use super::median_in_place;

    #[test]
    fn test_median_odd() {
        let mut v = [0.9f64, 0.1, 0.5];
        assert_eq!(median_in_place(&mut v), 0.5);
    }

    #[test]
    fn test_median_even() {
        let mut v = [0.9f32, 0.1, 0.7, 0.3];
        assert!((median_in_place(&mut v) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_median_empty() {
        let mut v: [f64; 0] = [];
        assert_eq!(median_in_place(&mut v), 0.0);
    }
}
