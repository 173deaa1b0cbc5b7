// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Loss Rate Density
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Analytic Touschek loss-rate density versus energy deviation.
//!
//! The density is written in the substitution variable κ with
//! τ = tan²κ, so the integration range δ ∈ [δ_acc, ∞) maps onto
//! κ ∈ [κ_min, π/2]. The energy spread enters through exp(−(B1 − B2)τ)
//! times the scaled Bessel function I0e(B2 τ).

use crate::acceptance::resample_acceptance;
use crate::model::AcceleratorModel;
use crate::report::SweepReport;
use ndarray::{Array1, ArrayView1};
use std::f64::consts::{FRAC_PI_2, PI};
use touschek_math::bessel::i0e;
use touschek_math::interp::nearest_index;
use touschek_math::quadrature::trapezoid;
use touschek_types::config::{DensityParams, DensityScaling, TouschekConfig};
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::{Branch, EnergyAcceptanceProfile, KinematicCoefficients, LossDensity};

/// Un-normalized loss-rate density at each κ.
///
/// `kappa_min` sets the lower limit τ_min = tan²κ_min and must give
/// τ_min > 0. `beta` is the relativistic velocity of the beam.
pub fn loss_rate_density(
    kappa: ArrayView1<'_, f64>,
    kappa_min: f64,
    b1: f64,
    b2: f64,
    beta: f64,
    scaling: DensityScaling,
) -> TouschekResult<Array1<f64>> {
    let tau_min = kappa_min.tan().powi(2);
    if !tau_min.is_finite() || tau_min <= 0.0 {
        return Err(TouschekError::DegenerateAngle {
            position: None,
            branch: None,
            message: format!("tau_min = {tau_min} from kappa_min = {kappa_min}"),
        });
    }
    if !beta.is_finite() || beta <= 0.0 || beta > 1.0 {
        return Err(TouschekError::PhysicsViolation(format!(
            "beta must be in (0, 1], got {beta}"
        )));
    }
    if !b1.is_finite() || !b2.is_finite() || b2 < 0.0 || b1 < b2 {
        return Err(TouschekError::PhysicsViolation(format!(
            "coefficients must satisfy b1 >= b2 >= 0, got b1={b1}, b2={b2}"
        )));
    }

    let prefactor = match scaling {
        DensityScaling::Raw => 1.0,
        DensityScaling::PositionComparable => {
            2.0 * (PI * (b1 * b1 - b2 * b2)).sqrt() * tau_min
        }
    };

    Ok(kappa.mapv(|k| {
        let tau = k.tan().powi(2);
        let ratio = tau / tau_min / (1.0 + tau);
        let mut arg = (2.0 * tau + 1.0).powi(2) * (ratio - 1.0) / tau;
        arg += tau - (tau * tau_min * (1.0 + tau)).sqrt();
        arg -= (2.0 + 1.0 / (2.0 * tau)) * ratio.ln();
        arg *= (1.0 + tau).sqrt();
        arg *= 1.0 / (2.0 * tau.sqrt()) / (1.0 + tau);
        arg *= 2.0 * beta * tau.sqrt();
        let bessel = (-(b1 - b2) * tau).exp() * i0e(b2 * tau);
        prefactor * arg * bessel
    }))
}

/// Read-only inputs shared by every position of a density sweep.
#[derive(Debug, Clone)]
pub struct DensityInputs {
    /// Optics-grid positions, indexing the coefficients.
    model_positions: Array1<f64>,
    /// Acceptance on the uniform resampled grid.
    acceptance: EnergyAcceptanceProfile,
    coefficients: KinematicCoefficients,
}

impl DensityInputs {
    pub fn new(
        model_positions: Array1<f64>,
        acceptance: EnergyAcceptanceProfile,
        coefficients: KinematicCoefficients,
    ) -> TouschekResult<Self> {
        if coefficients.len() != model_positions.len() {
            return Err(TouschekError::ConfigError(format!(
                "{} kinematic coefficients for {} optics positions",
                coefficients.len(),
                model_positions.len()
            )));
        }
        Ok(DensityInputs {
            model_positions,
            acceptance,
            coefficients,
        })
    }

    /// Query the model once and resample its acceptance.
    pub fn from_model<M: AcceleratorModel + ?Sized>(
        model: &M,
        acceptance_step: f64,
    ) -> TouschekResult<Self> {
        let acceptance = resample_acceptance(&model.energy_acceptance()?, acceptance_step)?;
        Self::new(model.positions()?, acceptance, model.touschek_coefficients()?)
    }

    pub fn model_positions(&self) -> ArrayView1<'_, f64> {
        self.model_positions.view()
    }

    pub fn acceptance(&self) -> &EnergyAcceptanceProfile {
        &self.acceptance
    }

    pub fn coefficients(&self) -> &KinematicCoefficients {
        &self.coefficients
    }
}

/// Normalized density for both branches at requested position `s`.
///
/// `index` is the position of `s` in the request and is used for error
/// context. Energy-deviation grids are returned as magnitudes for both
/// branches.
pub fn normalized_density_at(
    inputs: &DensityInputs,
    index: usize,
    s: f64,
    params: &DensityParams,
    beta: f64,
) -> TouschekResult<LossDensity> {
    if params.points < 2 {
        return Err(TouschekError::ConfigError(format!(
            "density.points must be >= 2, got {}",
            params.points
        )));
    }
    let acceptance_index = nearest_index(inputs.acceptance.positions.view(), s, "acceptance")?;
    let model_index = nearest_index(inputs.model_positions.view(), s, "optics")?;
    let (b1, b2) = inputs.coefficients.at(model_index);

    let branch = |sign: Branch| -> TouschekResult<(Array1<f64>, Array1<f64>)> {
        let limit = inputs.acceptance.limit(sign, acceptance_index);
        let kappa_min = (beta * limit).atan();
        let kappa = Array1::linspace(kappa_min, FRAC_PI_2, params.points);
        let delta = kappa.mapv(|k| k.tan() / beta);
        let mut density = loss_rate_density(kappa.view(), kappa_min, b1, b2, beta, params.scaling)
            .map_err(|e| e.at_position(index).on_branch(sign))?;

        let integral = trapezoid(density.view(), delta.view());
        if !integral.is_finite() || integral <= 0.0 {
            return Err(TouschekError::NormalizationFailure {
                position: index,
                branch: sign,
                integral,
            });
        }
        density.mapv_inplace(|v| v / integral);
        if params.clip_negative {
            let clipped = density.iter().filter(|&&v| v < 0.0).count();
            if clipped > 0 {
                log::debug!("position {index} ({sign}): clipped {clipped} negative density samples");
            }
            density.mapv_inplace(|v| v.max(0.0));
        }
        Ok((delta, density))
    };

    let (delta_positive, density_positive) = branch(Branch::Positive)?;
    let (delta_negative, density_negative) = branch(Branch::Negative)?;
    Ok(LossDensity {
        requested_position: s,
        acceptance_index,
        model_index,
        delta_positive,
        density_positive,
        delta_negative,
        density_negative,
    })
}

/// Normalized loss densities at every requested position.
///
/// Model queries happen once; a failure there fails the whole call.
/// Per-position failures are recorded in the report.
pub fn loss_density_sweep<M: AcceleratorModel + ?Sized>(
    model: &M,
    requested: &[f64],
    config: &TouschekConfig,
) -> TouschekResult<SweepReport<LossDensity>> {
    let inputs = DensityInputs::from_model(model, config.acceptance.step_m)?;
    let beta = config.beam.beta();
    let report = SweepReport::collect(requested, |index, s| {
        normalized_density_at(&inputs, index, s, &config.density, beta)
    });
    report.log_summary("loss density sweep");
    Ok(report)
}
