use crate::consts::EPSILON;

/// Soft-thresholding of a singular value.
pub fn soft_threshold(s: f64, lambda: f64) -> f64 {
    (s - lambda).max(0.0)
}

/// Divergence of singular value soft-thresholding at `lambda` for a real
/// `rows x cols` matrix with the given singular values (descending).
///
/// Closed form from Candès, Sing-Long and Trzasko (2013). Pairs of
/// (numerically) repeated singular values contribute nothing to the
/// cross term.
pub fn svt_divergence(singular_values: &[f64], lambda: f64, rows: usize, cols: usize) -> f64 {
    let k = rows.min(cols).min(singular_values.len());
    let s = &singular_values[..k];
    let gap = rows.abs_diff(cols) as f64;

    let mut div = 0.0;
    for (i, &si) in s.iter().enumerate() {
        let shrunk = soft_threshold(si, lambda);
        if shrunk <= 0.0 {
            continue;
        }
        div += 1.0 + gap * shrunk / si;
        for (j, &sj) in s.iter().enumerate() {
            if i == j {
                continue;
            }
            let denom = si * si - sj * sj;
            if denom.abs() > EPSILON {
                div += 2.0 * si * shrunk / denom;
            }
        }
    }
    div
}

/// Stein unbiased risk of thresholding one patch matrix at `lambda`, given
/// the per-sample noise `variance`.
pub fn patch_risk(
    singular_values: &[f64],
    lambda: f64,
    rows: usize,
    cols: usize,
    variance: f64,
) -> f64 {
    let residual: f64 = singular_values
        .iter()
        .map(|&s| {
            let removed = s.min(lambda);
            removed * removed
        })
        .sum();
    residual - (rows * cols) as f64 * variance
        + 2.0 * variance * svt_divergence(singular_values, lambda, rows, cols)
}
