// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Interpolation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 1-D grids, clamped linear interpolation and nearest-index lookup.

use ndarray::{Array1, ArrayView1};
use touschek_types::error::{TouschekError, TouschekResult};

/// Piecewise-linear interpolant over a non-decreasing abscissa.
///
/// Outside the tabulated range the end values are returned, matching
/// `numpy.interp`.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    xp: Array1<f64>,
    fp: Array1<f64>,
}

impl LinearInterpolator {
    pub fn new(xp: Array1<f64>, fp: Array1<f64>, label: &str) -> TouschekResult<Self> {
        if xp.len() != fp.len() {
            return Err(TouschekError::PhysicsViolation(format!(
                "{label} abscissa/ordinate length mismatch: {} vs {}",
                xp.len(),
                fp.len()
            )));
        }
        if xp.is_empty() {
            return Err(TouschekError::PhysicsViolation(format!(
                "{label} table must be non-empty"
            )));
        }
        if xp.iter().chain(fp.iter()).any(|v| !v.is_finite()) {
            return Err(TouschekError::PhysicsViolation(format!(
                "{label} table must be finite"
            )));
        }
        if let Some(i) = (1..xp.len()).find(|&i| xp[i] < xp[i - 1]) {
            return Err(TouschekError::PhysicsViolation(format!(
                "{label} abscissa must be non-decreasing (index {i})"
            )));
        }
        Ok(LinearInterpolator { xp, fp })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xp.len();
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= self.xp[0] {
            return self.fp[0];
        }
        if x >= self.xp[n - 1] {
            return self.fp[n - 1];
        }
        // First index with xp > x; x is strictly inside so 1 <= hi <= n - 1.
        let hi = self
            .xp
            .as_slice()
            .map(|s| s.partition_point(|&v| v <= x))
            .unwrap_or_else(|| self.xp.iter().take_while(|&&v| v <= x).count());
        let lo = hi - 1;
        let t = (x - self.xp[lo]) / (self.xp[hi] - self.xp[lo]);
        self.fp[lo] + t * (self.fp[hi] - self.fp[lo])
    }

    pub fn eval_many(&self, xs: ArrayView1<'_, f64>) -> Array1<f64> {
        xs.mapv(|x| self.eval(x))
    }
}

/// Geometric grid of `n` points from `start` to `stop` (both > 0).
pub fn geomspace(start: f64, stop: f64, n: usize) -> TouschekResult<Array1<f64>> {
    if !start.is_finite() || start <= 0.0 || !stop.is_finite() || stop <= 0.0 {
        return Err(TouschekError::PhysicsViolation(format!(
            "geometric grid endpoints must be finite and > 0, got {start}..{stop}"
        )));
    }
    if n < 2 {
        return Err(TouschekError::PhysicsViolation(format!(
            "geometric grid needs at least 2 points, got {n}"
        )));
    }
    let mut grid = Array1::linspace(start.log10(), stop.log10(), n).mapv(|e| 10f64.powf(e));
    // Pin the endpoints against powf round-off.
    grid[0] = start;
    grid[n - 1] = stop;
    Ok(grid)
}

/// Index of the axis point closest to `value`; ties resolve to the lower index.
pub fn nearest_index(axis: ArrayView1<'_, f64>, value: f64, label: &str) -> TouschekResult<usize> {
    if axis.is_empty() {
        return Err(TouschekError::PhysicsViolation(format!(
            "{label} axis must be non-empty"
        )));
    }
    if !value.is_finite() {
        return Err(TouschekError::PhysicsViolation(format!(
            "{label} lookup coordinate must be finite"
        )));
    }
    let mut best_idx = 0usize;
    let mut best_dist = f64::INFINITY;
    for (idx, x) in axis.iter().copied().enumerate() {
        if !x.is_finite() {
            return Err(TouschekError::PhysicsViolation(format!(
                "{label} axis contains non-finite coordinate at index {idx}"
            )));
        }
        let dist = (x - value).abs();
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }
    Ok(best_idx)
}
