// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Loss Histograms
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Monte Carlo lost-particle energy deviations at requested positions.
//!
//! Every position draws its own pairs from the local envelope, scatters them
//! and keeps the particles beyond the cutoff. Positions are independent and
//! each owns a generator seeded with `seed + index`, so serial and parallel
//! runs agree exactly.

use crate::acceptance::resample_acceptance;
use crate::model::AcceleratorModel;
use crate::pair_sampler::PairSampler;
use crate::report::SweepReport;
use crate::scattering::{ScatterOutcome, ScatteringEngine};
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use touschek_math::interp::nearest_index;
use touschek_types::config::{CutoffPolicy, MonteCarloParams, TouschekConfig};
use touschek_types::constants::PERCENT;
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::{
    Branch, CovarianceMatrix, EnergyAcceptanceProfile, LossHistogram, ParticleBatch, DELTA,
};

/// Read-only inputs shared by every position of a histogram sweep.
#[derive(Debug, Clone)]
pub struct HistogramInputs {
    model_positions: Array1<f64>,
    /// Acceptance on the uniform resampled grid.
    acceptance: EnergyAcceptanceProfile,
    /// One envelope per optics-grid point.
    envelopes: Vec<CovarianceMatrix>,
}

impl HistogramInputs {
    pub fn new(
        model_positions: Array1<f64>,
        acceptance: EnergyAcceptanceProfile,
        envelopes: Vec<CovarianceMatrix>,
    ) -> TouschekResult<Self> {
        if envelopes.len() != model_positions.len() {
            return Err(TouschekError::ConfigError(format!(
                "{} envelopes for {} optics positions",
                envelopes.len(),
                model_positions.len()
            )));
        }
        Ok(HistogramInputs {
            model_positions,
            acceptance,
            envelopes,
        })
    }

    pub fn from_model<M: AcceleratorModel + ?Sized>(
        model: &M,
        acceptance_step: f64,
    ) -> TouschekResult<Self> {
        let acceptance = resample_acceptance(&model.energy_acceptance()?, acceptance_step)?;
        Self::new(model.positions()?, acceptance, model.envelopes()?)
    }

    pub fn model_positions(&self) -> ArrayView1<'_, f64> {
        self.model_positions.view()
    }

    pub fn acceptance(&self) -> &EnergyAcceptanceProfile {
        &self.acceptance
    }

    pub fn envelopes(&self) -> &[CovarianceMatrix] {
        &self.envelopes
    }
}

/// Whether an energy deviation on `branch` lies beyond the cutoff.
///
/// `acceptance` holds the local (positive, negative) magnitudes used by
/// [`CutoffPolicy::LocalAcceptance`].
pub fn beyond_cutoff(policy: CutoffPolicy, branch: Branch, delta: f64, acceptance: (f64, f64)) -> bool {
    match (policy, branch) {
        (CutoffPolicy::LocalAcceptance, Branch::Positive) => delta > acceptance.0,
        (CutoffPolicy::LocalAcceptance, Branch::Negative) => delta < -acceptance.1,
        (CutoffPolicy::Fixed { threshold }, Branch::Positive) => delta >= threshold,
        (CutoffPolicy::Fixed { threshold }, Branch::Negative) => delta <= -threshold,
    }
}

/// Energy deviations [%] of particle 1 beyond the positive cutoff and of
/// particle 2 beyond the negative one.
pub fn classify_losses(
    outcome: &ScatterOutcome,
    policy: CutoffPolicy,
    acceptance: (f64, f64),
) -> (Vec<f64>, Vec<f64>) {
    let lost = |batch: &ParticleBatch, branch: Branch| -> Vec<f64> {
        batch
            .coordinate(DELTA)
            .iter()
            .copied()
            .filter(|&d| beyond_cutoff(policy, branch, d, acceptance))
            .map(|d| d * PERCENT)
            .collect()
    };
    (
        lost(&outcome.particle1, Branch::Positive),
        lost(&outcome.particle2, Branch::Negative),
    )
}

/// Simulate one requested position. `index` selects the generator seed and
/// tags any error.
pub fn histogram_at(
    inputs: &HistogramInputs,
    index: usize,
    s: f64,
    engine: &ScatteringEngine,
    params: &MonteCarloParams,
) -> TouschekResult<LossHistogram> {
    let model_index = nearest_index(inputs.model_positions.view(), s, "optics")?;
    let acceptance_index = nearest_index(inputs.acceptance.positions.view(), s, "acceptance")?;
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(index as u64));

    let sampler = PairSampler::new(&inputs.envelopes[model_index])?;
    let (particle1, particle2) = sampler.sample(params.particles, &mut rng);
    let outcome = engine.scatter(&particle1, &particle2, params.de_min, &mut rng)?;

    let local = (
        inputs.acceptance.limit(Branch::Positive, acceptance_index),
        inputs.acceptance.limit(Branch::Negative, acceptance_index),
    );
    let (lost_positive_pct, lost_negative_pct) = classify_losses(&outcome, params.cutoff, local);
    log::debug!(
        "position {index} (s = {s}): {} lost positive, {} lost negative of {}",
        lost_positive_pct.len(),
        lost_negative_pct.len(),
        params.particles
    );
    Ok(LossHistogram {
        requested_position: s,
        model_index,
        acceptance_index,
        lost_positive_pct,
        lost_negative_pct,
    })
}

/// Run every requested position, in parallel when the config asks for it.
pub fn histogram_sweep(
    inputs: &HistogramInputs,
    requested: &[f64],
    engine: &ScatteringEngine,
    params: &MonteCarloParams,
) -> SweepReport<LossHistogram> {
    let run = |(index, &s): (usize, &f64)| histogram_at(inputs, index, s, engine, params);
    let outcomes: Vec<TouschekResult<LossHistogram>> = if params.parallel {
        requested.par_iter().enumerate().map(run).collect()
    } else {
        requested.iter().enumerate().map(run).collect()
    };
    SweepReport::from_outcomes(requested, outcomes)
}

/// Query the model once, then simulate every requested position.
pub fn loss_histograms<M: AcceleratorModel + ?Sized>(
    model: &M,
    requested: &[f64],
    config: &TouschekConfig,
) -> TouschekResult<SweepReport<LossHistogram>> {
    let inputs = HistogramInputs::from_model(model, config.acceptance.step_m)?;
    let engine = ScatteringEngine::from_config(config);
    let report = histogram_sweep(&inputs, requested, &engine, &config.monte_carlo);
    report.log_summary("loss histograms");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabulatedModel;
    use ndarray::{array, Array2};
    use touschek_types::state::{ScatteringAngles, XP, YP};

    fn nominal_cov() -> CovarianceMatrix {
        Array2::from_diag(&array![1e-8, 1e-9, 1e-8, 1e-9, 1e-3, 1e-3])
    }

    fn small_config(particles: usize, parallel: bool) -> TouschekConfig {
        let mut config = TouschekConfig::default();
        config.monte_carlo.particles = particles;
        config.monte_carlo.parallel = parallel;
        config
    }

    fn ring() -> TabulatedModel {
        TabulatedModel::uniform(
            vec![0.0, 2.0, 4.0, 6.0],
            5.0,
            (0.03, 0.025),
            (600.0, 500.0),
            &nominal_cov(),
        )
        .unwrap()
    }

    fn outcome_with(delta1: Vec<f64>, delta2: Vec<f64>) -> ScatterOutcome {
        let n = delta1.len();
        let mut p1 = ParticleBatch::zeros(n);
        let mut p2 = ParticleBatch::zeros(n);
        p1.coordinate_mut(DELTA).assign(&Array1::from(delta1));
        p2.coordinate_mut(DELTA).assign(&Array1::from(delta2));
        ScatterOutcome {
            particle1: p1,
            particle2: p2,
            angles: ScatteringAngles {
                phi: Array1::zeros(n),
                psi: Array1::zeros(n),
                chi: Array1::zeros(n),
            },
            psi_min: 1.5,
            solid_angle_fraction: 1.5 / std::f64::consts::FRAC_PI_2,
            degenerate_frames: 0,
        }
    }

    #[test]
    fn test_fixed_cutoff_is_inclusive() {
        let outcome = outcome_with(vec![0.01, 0.005, 0.2], vec![-0.01, -0.009, 0.3]);
        let (pos, neg) = classify_losses(&outcome, CutoffPolicy::default(), (0.5, 0.5));
        assert_eq!(pos.len(), 2);
        assert!((pos[0] - 1.0).abs() < 1e-12 && (pos[1] - 20.0).abs() < 1e-12);
        assert_eq!(neg.len(), 1);
        assert!((neg[0] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_local_cutoff_uses_acceptance() {
        let outcome = outcome_with(vec![0.03, 0.031, 0.01], vec![-0.02, -0.021, -0.5]);
        let (pos, neg) = classify_losses(&outcome, CutoffPolicy::LocalAcceptance, (0.03, 0.02));
        assert_eq!(pos.len(), 1);
        assert!((pos[0] - 3.1).abs() < 1e-12);
        assert_eq!(neg.len(), 2);
    }

    #[test]
    fn test_fixed_cutoff_histogram_nonempty_and_bounded() {
        let report = loss_histograms(&ring(), &[1.1], &small_config(10_000, false)).unwrap();
        let hist = report.into_result().unwrap().remove(0);
        assert_eq!(hist.model_index, 1);
        assert!(!hist.lost_positive_pct.is_empty());
        assert!(!hist.lost_negative_pct.is_empty());
        assert!(hist.lost_positive_pct.len() < 10_000);
        assert!(hist.lost_positive_pct.iter().all(|&v| v >= 1.0));
        assert!(hist.lost_negative_pct.iter().all(|&v| v <= -1.0));
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let positions = [0.0, 1.9, 4.4, 6.0];
        let serial = loss_histograms(&ring(), &positions, &small_config(2_000, false))
            .unwrap()
            .into_result()
            .unwrap();
        let parallel = loss_histograms(&ring(), &positions, &small_config(2_000, true))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_failing_position_does_not_stop_others() {
        let mut model = ring();
        // Zero angular spread at the second grid point: chi_max = 0 there.
        let mut flat = nominal_cov();
        flat[[XP, XP]] = 0.0;
        flat[[YP, YP]] = 0.0;
        model.envelopes[1] = flat.outer_iter().map(|row| row.to_vec()).collect();

        let report = loss_histograms(&model, &[0.0, 2.0, 4.0], &small_config(1_000, true)).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.n_failed(), 1);
        let (entry, err) = report.failures().next().unwrap();
        assert_eq!(entry.index, 1);
        match err {
            TouschekError::DegenerateAngle { position, .. } => assert_eq!(*position, Some(1)),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert_eq!(report.successes().count(), 2);
    }

    #[test]
    fn test_inputs_reject_envelope_mismatch() {
        let acceptance =
            EnergyAcceptanceProfile::new(array![0.0, 10.0], array![0.03, 0.03], array![0.02, 0.02])
                .unwrap();
        assert!(HistogramInputs::new(array![0.0, 10.0], acceptance, vec![nominal_cov()]).is_err());
    }

    #[test]
    fn test_inputs_from_model_one_envelope_per_optics_point() {
        let inputs = HistogramInputs::from_model(&ring(), 0.1).unwrap();
        assert_eq!(inputs.envelopes().len(), inputs.model_positions().len());
        assert!(inputs.acceptance().positions.len() > inputs.model_positions().len());
    }
}
