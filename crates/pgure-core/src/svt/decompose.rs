use ndarray::{Array2, ArrayView2};

use crate::consts::{EPSILON, JACOBI_MAX_SWEEPS};

/// Singular values and right singular vectors of a tall or wide matrix.
///
/// Computed from the eigen-decomposition of the Gram matrix `MᵀM`, which is
/// only `n x n` for an `m x n` Casorati matrix with few columns. Singular
/// values are sorted in descending order; `v` holds the matching right
/// singular vectors as columns.
#[derive(Clone, Debug)]
pub struct GramSvd {
    pub singular_values: Vec<f64>,
    pub v: Array2<f64>,
}

impl GramSvd {
    pub fn compute(m: ArrayView2<'_, f64>) -> Self {
        let gram = m.t().dot(&m);
        let (eigenvalues, v) = symmetric_eigen(gram);
        let singular_values = eigenvalues.iter().map(|l| l.max(0.0).sqrt()).collect();
        Self { singular_values, v }
    }

    /// Rebuild `m` with every singular value `s` replaced by `shrink(s)`.
    ///
    /// Uses `M V diag(shrink(s) / s) Vᵀ`, so the left singular vectors are
    /// never materialised. Directions with a vanishing singular value are
    /// dropped.
    pub fn rebuild(&self, m: ArrayView2<'_, f64>, shrink: impl Fn(f64) -> f64) -> Array2<f64> {
        let mut mv = m.dot(&self.v);
        for (mut column, &s) in mv.columns_mut().into_iter().zip(&self.singular_values) {
            let ratio = if s > EPSILON { shrink(s) / s } else { 0.0 };
            column *= ratio;
        }
        mv.dot(&self.v.t())
    }
}

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues in descending order and the eigenvectors as the
/// columns of the second element.
pub fn symmetric_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off = 0.0;
        let mut diag = 0.0;
        for p in 0..n {
            diag += a[[p, p]] * a[[p, p]];
            for q in p + 1..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off <= EPSILON * EPSILON * diag.max(EPSILON) {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let eigenvalues = order.iter().map(|&i| a[[i, i]]).collect();
    let mut sorted = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        sorted.column_mut(dst).assign(&v.column(src));
    }
    (eigenvalues, sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eigen_diagonal() {
        let (vals, _) = symmetric_eigen(array![[1.0, 0.0], [0.0, 3.0]]);
        assert!((vals[0] - 3.0).abs() < 1e-12);
        assert!((vals[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_eigen_reconstructs() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (vals, v) = symmetric_eigen(a.clone());
        let d = Array2::from_diag(&ndarray::Array1::from(vals));
        let back = v.dot(&d).dot(&v.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rebuild_identity_shrink() {
        let m = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.5]];
        let svd = GramSvd::compute(m.view());
        let back = svd.rebuild(m.view(), |s| s);
        for (x, y) in back.iter().zip(m.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rank_one_singular_value() {
        // Outer product of (1, 2) and (3, 4): single singular value |u||v| = sqrt(5) * 5.
        let m = array![[3.0, 4.0], [6.0, 8.0]];
        let svd = GramSvd::compute(m.view());
        assert!((svd.singular_values[0] - 5.0 * 5f64.sqrt()).abs() < 1e-9);
        assert!(svd.singular_values[1].abs() < 1e-4);
    }
}
