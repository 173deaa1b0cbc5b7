// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Trapezoid rule on non-uniform grids.

use ndarray::{Array1, ArrayView1};

/// ∫ y dx by the trapezoid rule. Matches `numpy.trapz(y, x)`.
///
/// Panics in debug builds if the lengths differ; returns 0 for fewer
/// than two samples.
pub fn trapezoid(y: ArrayView1<'_, f64>, x: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(y.len(), x.len(), "trapezoid length mismatch");
    let n = y.len().min(x.len());
    (1..n)
        .map(|i| 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]))
        .sum()
}

/// Running trapezoid integral starting at 0.
/// Matches `scipy.integrate.cumulative_trapezoid(y, x, initial=0)`.
pub fn cumulative_trapezoid(y: ArrayView1<'_, f64>, x: ArrayView1<'_, f64>) -> Array1<f64> {
    debug_assert_eq!(y.len(), x.len(), "cumulative_trapezoid length mismatch");
    let n = y.len().min(x.len());
    let mut out = Array1::zeros(n);
    for i in 1..n {
        out[i] = out[i - 1] + 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
    }
    out
}
