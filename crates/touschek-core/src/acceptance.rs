// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Acceptance Resampler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Energy acceptance on a uniform longitudinal grid.

use ndarray::Array1;
use touschek_math::interp::LinearInterpolator;
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::EnergyAcceptanceProfile;

/// Resample both acceptance branches onto `floor(range / step)` evenly
/// spaced points from the first to the last tabulated position.
///
/// The grid spacing is `range / (npt - 1)`, i.e. the nominal step rounded so
/// that both end positions are kept. Values outside the table are clamped.
pub fn resample_acceptance(
    profile: &EnergyAcceptanceProfile,
    step: f64,
) -> TouschekResult<EnergyAcceptanceProfile> {
    if !step.is_finite() || step <= 0.0 {
        return Err(TouschekError::ConfigError(format!(
            "acceptance step must be finite and > 0, got {step}"
        )));
    }
    let n = profile.len();
    if n < 2 {
        return Err(TouschekError::ConfigError(format!(
            "acceptance profile needs at least 2 positions, got {n}"
        )));
    }
    let s = &profile.positions;
    if s.iter().any(|v| !v.is_finite()) {
        return Err(TouschekError::ConfigError(
            "acceptance positions must be finite".to_string(),
        ));
    }
    if let Some(i) = (1..n).find(|&i| s[i] <= s[i - 1]) {
        return Err(TouschekError::ConfigError(format!(
            "acceptance positions must be strictly increasing (index {i})"
        )));
    }

    let (first, last) = (s[0], s[n - 1]);
    let npt = ((last - first) / step).floor() as usize;
    if npt < 2 {
        return Err(TouschekError::ConfigError(format!(
            "acceptance range {} with step {step} gives {npt} resampled points, need >= 2",
            last - first
        )));
    }

    let grid = Array1::linspace(first, last, npt);
    let positive = LinearInterpolator::new(s.clone(), profile.positive.clone(), "positive acceptance")?
        .eval_many(grid.view());
    let negative = LinearInterpolator::new(s.clone(), profile.negative.clone(), "negative acceptance")?
        .eval_many(grid.view());
    EnergyAcceptanceProfile::new(grid, positive, negative)
}
