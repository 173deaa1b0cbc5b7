// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Linear Algebra
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Small dense linear algebra for covariance matrices.
//!
//! Cholesky factorization tolerant of zero-variance directions, a
//! Gauss–Jordan inverse and symmetric reordering. Matrices here are at
//! most 6x6.

use ndarray::{Array2, Axis};
use touschek_types::error::{TouschekError, TouschekResult};

/// Relative tolerance on a Cholesky pivot, measured against the diagonal entry.
const PIVOT_RTOL: f64 = 1e-10;

/// Relative pivot size below which a matrix is treated as singular.
const SINGULAR_RTOL: f64 = 1e-14;

/// Lower-triangular L with A = L Lᵀ for a symmetric positive-semidefinite A.
///
/// A pivot that vanishes within round-off zeroes its column, so degenerate
/// directions (a coordinate with zero spread) are allowed. A clearly
/// negative pivot is a `PhysicsViolation`.
pub fn cholesky_psd(a: &Array2<f64>) -> TouschekResult<Array2<f64>> {
    let (n, m) = a.dim();
    if n != m {
        return Err(TouschekError::PhysicsViolation(format!(
            "cholesky needs a square matrix, got {n}x{m}"
        )));
    }
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        let tol = PIVOT_RTOL * a[[j, j]].abs() + f64::MIN_POSITIVE;
        if d < -tol {
            return Err(TouschekError::PhysicsViolation(format!(
                "matrix is not positive semidefinite (pivot {j} = {d:e})"
            )));
        }
        if d <= tol {
            continue;
        }
        let pivot = d.sqrt();
        l[[j, j]] = pivot;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / pivot;
        }
    }
    Ok(l)
}

/// Inverse by Gauss–Jordan elimination with partial pivoting.
///
/// Returns `SingularMatrix` (without position context) when a pivot is
/// negligible relative to the largest entry.
pub fn invert(a: &Array2<f64>) -> TouschekResult<Array2<f64>> {
    let (n, m) = a.dim();
    if n != m {
        return Err(TouschekError::PhysicsViolation(format!(
            "inverse needs a square matrix, got {n}x{m}"
        )));
    }
    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(TouschekError::SingularMatrix {
            position: None,
            message: format!("{n}x{n} block is zero or non-finite"),
        });
    }

    let mut work = a.clone();
    let mut inv = Array2::<f64>::eye(n);
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| work[[r1, col]].abs().total_cmp(&work[[r2, col]].abs()))
            .unwrap_or(col);
        let pivot = work[[pivot_row, col]];
        if pivot.abs() <= SINGULAR_RTOL * scale {
            return Err(TouschekError::SingularMatrix {
                position: None,
                message: format!("{n}x{n} block has a vanishing pivot in column {col}"),
            });
        }
        if pivot_row != col {
            for k in 0..n {
                work.swap([col, k], [pivot_row, k]);
                inv.swap([col, k], [pivot_row, k]);
            }
        }
        for k in 0..n {
            work[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = work[[r, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                work[[r, k]] -= factor * work[[col, k]];
                inv[[r, k]] -= factor * inv[[col, k]];
            }
        }
    }
    Ok(inv)
}

/// P A Pᵀ for the permutation that puts row/column `order[k]` at `k`.
pub fn permute_symmetric(a: &Array2<f64>, order: &[usize]) -> TouschekResult<Array2<f64>> {
    let (n, m) = a.dim();
    let mut seen = vec![false; n];
    let valid = n == m
        && order.len() == n
        && order
            .iter()
            .all(|&i| i < n && !std::mem::replace(&mut seen[i], true));
    if !valid {
        return Err(TouschekError::PhysicsViolation(format!(
            "order {order:?} is not a permutation of a {n}x{m} matrix"
        )));
    }
    Ok(a.select(Axis(0), order).select(Axis(1), order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
    }

    #[test]
    fn test_cholesky_reconstructs_spd() {
        let a = array![[4.0, 2.0, 0.6], [2.0, 5.0, 1.0], [0.6, 1.0, 3.0]];
        let l = cholesky_psd(&a).unwrap();
        let back = l.dot(&l.t());
        assert!(max_abs_diff(&a, &back) < 1e-12);
        assert_eq!(l[[0, 1]], 0.0);
        assert_eq!(l[[1, 2]], 0.0);
    }

    #[test]
    fn test_cholesky_tolerates_zero_variance() {
        let a = array![[1e-8, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1e-3]];
        let l = cholesky_psd(&a).unwrap();
        assert_eq!(l[[1, 1]], 0.0);
        assert!(max_abs_diff(&a, &l.dot(&l.t())) < 1e-18);
    }

    #[test]
    fn test_cholesky_rank_deficient() {
        // Rank one: v vᵀ with v = (1, 2)
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let l = cholesky_psd(&a).unwrap();
        assert!(max_abs_diff(&a, &l.dot(&l.t())) < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        match cholesky_psd(&a).unwrap_err() {
            TouschekError::PhysicsViolation(msg) => {
                assert!(msg.contains("positive semidefinite"), "{msg}");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invert_identity_product() {
        let a = array![[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let inv = invert(&a).unwrap();
        assert!(max_abs_diff(&a.dot(&inv), &Array2::eye(3)) < 1e-12);
    }

    #[test]
    fn test_invert_badly_scaled_diagonal() {
        let a = Array2::from_diag(&array![1e-8, 1e-8, 1e-3]);
        let inv = invert(&a).unwrap();
        assert!((inv[[0, 0]] - 1e8).abs() < 1e-4);
        assert!((inv[[2, 2]] - 1e3).abs() < 1e-9);
    }

    #[test]
    fn test_invert_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        match invert(&a).unwrap_err() {
            TouschekError::SingularMatrix { position, .. } => assert!(position.is_none()),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(invert(&Array2::zeros((3, 3))).is_err());
    }

    #[test]
    fn test_permute_symmetric_moves_blocks() {
        let a = array![[1.0, 0.1, 0.2], [0.1, 2.0, 0.3], [0.2, 0.3, 3.0]];
        let p = permute_symmetric(&a, &[2, 0, 1]).unwrap();
        assert_eq!(p[[0, 0]], 3.0);
        assert_eq!(p[[1, 2]], 0.1);
        assert_eq!(p[[0, 1]], 0.2);
        assert_eq!(p, p.t());
    }

    #[test]
    fn test_permute_symmetric_rejects_bad_order() {
        let a = Array2::<f64>::eye(3);
        assert!(permute_symmetric(&a, &[0, 1]).is_err());
        assert!(permute_symmetric(&a, &[0, 0, 1]).is_err());
        assert!(permute_symmetric(&a, &[0, 1, 3]).is_err());
    }
}
