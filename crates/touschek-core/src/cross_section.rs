// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Cross Section Sampler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Polar scattering angle ψ drawn from the Møller cross section.
//!
//! The cumulative distribution is tabulated on a grid in ψ that is
//! logarithmic in π/2 − ψ between π/2 − ψ_min and the configured span, and
//! inverted by interpolation. When ψ_min is close to π/2 the points crowd
//! toward ψ_min where the density changes fastest. When π/2 − ψ_min exceeds
//! the span the grid runs from ψ_min up to π/2 − span instead.

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use std::f64::consts::FRAC_PI_2;
use touschek_math::interp::{geomspace, LinearInterpolator};
use touschek_math::quadrature::cumulative_trapezoid;
use touschek_types::config::CrossSectionParams;
use touschek_types::constants::NEGLIGIBLE_RELATIVE_VELOCITY;
use touschek_types::error::{TouschekError, TouschekResult};

/// Tabulated CDF of ψ between ψ_min and π/2 − span.
#[derive(Debug, Clone)]
pub struct CrossSectionDistribution {
    psi: Array1<f64>,
    cdf: Array1<f64>,
    inverse: LinearInterpolator,
}

/// Unnormalized Møller density in ψ.
///
/// The relativistic term carries a 1/β̄² factor and is dropped when the
/// relative velocity `beta_bar` is negligible.
pub fn moller_density(psi: f64, beta_bar: f64) -> f64 {
    let c = psi.cos();
    let mut cross = 4.0 / c + 1.0;
    if beta_bar > NEGLIGIBLE_RELATIVE_VELOCITY {
        let g = (1.0 + 1.0 / (beta_bar * beta_bar)).powi(2);
        cross += g * (2.0 * (1.0 + c * c) / c.powi(3) - 3.0 / c);
    }
    cross * psi.sin()
}

impl CrossSectionDistribution {
    /// Build the CDF for angles up to `psi_min`.
    pub fn new(psi_min: f64, beta_bar: f64, params: &CrossSectionParams) -> TouschekResult<Self> {
        if !psi_min.is_finite() || psi_min <= 0.0 || psi_min >= FRAC_PI_2 {
            return Err(TouschekError::DegenerateAngle {
                position: None,
                branch: None,
                message: format!("psi_min must lie in (0, pi/2), got {psi_min}"),
            });
        }
        let gap = FRAC_PI_2 - psi_min;
        let span = params.log_span_rad;
        if gap == span {
            return Err(TouschekError::DegenerateAngle {
                position: None,
                branch: None,
                message: format!("pi/2 - psi_min = {gap} collapses the {span} rad angle grid"),
            });
        }

        let offsets = geomspace(gap.min(span), gap.max(span), params.points)?;
        // Ascending ψ in both orientations.
        let psi: Array1<f64> = offsets.iter().rev().map(|u| FRAC_PI_2 - u).collect();
        let density = psi.mapv(|p| moller_density(p, beta_bar));
        let mut cdf = cumulative_trapezoid(density.view(), psi.view());
        let total = cdf[cdf.len() - 1];
        if !total.is_finite() || total <= 0.0 {
            return Err(TouschekError::DegenerateAngle {
                position: None,
                branch: None,
                message: format!("cross-section integral is {total}"),
            });
        }
        cdf.mapv_inplace(|v| v / total);

        let inverse = LinearInterpolator::new(cdf.clone(), psi.clone(), "cross-section cdf")?;
        Ok(CrossSectionDistribution { psi, cdf, inverse })
    }

    pub fn psi(&self) -> ArrayView1<'_, f64> {
        self.psi.view()
    }

    pub fn cdf(&self) -> ArrayView1<'_, f64> {
        self.cdf.view()
    }

    /// ψ at cumulative probability `u`.
    pub fn quantile(&self, u: f64) -> f64 {
        self.inverse.eval(u)
    }

    /// `n` independent draws.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Array1<f64> {
        Array1::from_iter((0..n).map(|_| self.quantile(rng.gen::<f64>())))
    }
}
