// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Accelerator Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Read-only interface to the accelerator optics provider, plus a
//! table-backed implementation loadable from JSON.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::{
    validate_covariance, CovarianceMatrix, EnergyAcceptanceProfile, KinematicCoefficients, Optics,
    PHASE_SPACE_DIM,
};

/// Which optics-grid points to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionSelector {
    /// Every point of the closed lattice.
    All,
    /// Selected grid indices, in the given order.
    Indices(Vec<usize>),
}

/// Optics, acceptance, kinematic coefficients and beam envelopes along the ring.
///
/// Implementations are expected to be side-effect free. Every position-indexed
/// quantity shares the grid returned by [`AcceleratorModel::positions`], except
/// the acceptance profile, which carries its own positions.
pub trait AcceleratorModel {
    /// Linear optics at `energy_offset`. An invalid solution (unstable orbit,
    /// non-finite beta) is an `UpstreamOptics` error.
    fn optics(&self, selector: &PositionSelector, energy_offset: f64) -> TouschekResult<Optics>;

    fn energy_acceptance(&self) -> TouschekResult<EnergyAcceptanceProfile>;

    fn touschek_coefficients(&self) -> TouschekResult<KinematicCoefficients>;

    /// One 6×6 second-moment matrix per optics-grid point.
    fn envelopes(&self) -> TouschekResult<Vec<CovarianceMatrix>>;

    /// Longitudinal positions of the on-momentum optics grid.
    fn positions(&self) -> TouschekResult<Array1<f64>> {
        Ok(self.optics(&PositionSelector::All, 0.0)?.positions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedAcceptance {
    pub positions: Vec<f64>,
    pub positive: Vec<f64>,
    pub negative: Vec<f64>,
}

/// Horizontal physical aperture per optics-grid point [m].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedAperture {
    pub h_min: Vec<f64>,
    pub h_max: Vec<f64>,
}

/// Ring description held in memory.
///
/// Off-momentum optics are first order: the closed orbit moves by
/// `dispersion_x · δ` and beta is unchanged. Offsets beyond
/// `max_stable_offset` have no stable solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedModel {
    pub positions: Vec<f64>,
    pub beta_x: Vec<f64>,
    #[serde(default)]
    pub closed_orbit_x: Vec<f64>,
    #[serde(default)]
    pub dispersion_x: Vec<f64>,
    #[serde(default = "default_max_stable_offset")]
    pub max_stable_offset: f64,
    pub acceptance: TabulatedAcceptance,
    pub b1: Vec<f64>,
    pub b2: Vec<f64>,
    /// Row-major 6×6 matrices, one per position.
    pub envelopes: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub aperture: Option<TabulatedAperture>,
}

fn default_max_stable_offset() -> f64 {
    0.1
}

impl TabulatedModel {
    pub fn from_file(path: &str) -> TouschekResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&contents)?;
        model.validate()?;
        Ok(model)
    }

    /// Uniform ring: every position shares the same envelope, optics,
    /// coefficients and acceptance.
    pub fn uniform(
        positions: Vec<f64>,
        beta_x: f64,
        acceptance: (f64, f64),
        coefficients: (f64, f64),
        envelope: &CovarianceMatrix,
    ) -> TouschekResult<Self> {
        let n = positions.len();
        let env: Vec<Vec<f64>> = envelope.outer_iter().map(|row| row.to_vec()).collect();
        let model = TabulatedModel {
            beta_x: vec![beta_x; n],
            closed_orbit_x: vec![0.0; n],
            dispersion_x: vec![0.0; n],
            max_stable_offset: default_max_stable_offset(),
            acceptance: TabulatedAcceptance {
                positions: positions.clone(),
                positive: vec![acceptance.0; n],
                negative: vec![acceptance.1; n],
            },
            b1: vec![coefficients.0; n],
            b2: vec![coefficients.1; n],
            envelopes: vec![env; n],
            aperture: None,
            positions,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn aperture(&self) -> Option<&TabulatedAperture> {
        self.aperture.as_ref()
    }

    pub fn validate(&self) -> TouschekResult<()> {
        let n = self.positions.len();
        if n == 0 {
            return Err(TouschekError::ConfigError(
                "model needs at least one position".to_string(),
            ));
        }
        let per_position = [
            ("beta_x", self.beta_x.len(), false),
            ("closed_orbit_x", self.closed_orbit_x.len(), true),
            ("dispersion_x", self.dispersion_x.len(), true),
            ("b1", self.b1.len(), false),
            ("b2", self.b2.len(), false),
            ("envelopes", self.envelopes.len(), false),
        ];
        for (label, len, may_be_empty) in per_position {
            if len != n && !(may_be_empty && len == 0) {
                return Err(TouschekError::ConfigError(format!(
                    "{label} has {len} entries, expected {n}"
                )));
            }
        }
        if let Some(i) = (1..n).find(|&i| self.positions[i] <= self.positions[i - 1]) {
            return Err(TouschekError::ConfigError(format!(
                "model positions must be strictly increasing (index {i})"
            )));
        }
        if !self.max_stable_offset.is_finite() || self.max_stable_offset <= 0.0 {
            return Err(TouschekError::ConfigError(format!(
                "max_stable_offset must be finite and > 0, got {}",
                self.max_stable_offset
            )));
        }
        for (i, env) in self.envelopes.iter().enumerate() {
            if env.len() != PHASE_SPACE_DIM || env.iter().any(|row| row.len() != PHASE_SPACE_DIM) {
                return Err(TouschekError::ConfigError(format!(
                    "envelope {i} must be {PHASE_SPACE_DIM}x{PHASE_SPACE_DIM}"
                )));
            }
        }
        if let Some(aperture) = &self.aperture {
            if aperture.h_min.len() != n || aperture.h_max.len() != n {
                return Err(TouschekError::ConfigError(format!(
                    "aperture tables must have {n} entries"
                )));
            }
        }
        // Surface acceptance and coefficient problems at load time.
        self.energy_acceptance()?;
        self.touschek_coefficients()?;
        Ok(())
    }

    fn column(values: &[f64], n: usize) -> Array1<f64> {
        if values.is_empty() {
            Array1::zeros(n)
        } else {
            Array1::from(values.to_vec())
        }
    }
}

impl AcceleratorModel for TabulatedModel {
    fn optics(&self, selector: &PositionSelector, energy_offset: f64) -> TouschekResult<Optics> {
        if !energy_offset.is_finite() || energy_offset.abs() > self.max_stable_offset {
            return Err(TouschekError::UpstreamOptics {
                energy_offset,
                message: format!(
                    "no stable closed orbit beyond |delta| = {}",
                    self.max_stable_offset
                ),
            });
        }
        let n = self.len();
        let orbit = Self::column(&self.closed_orbit_x, n);
        let dispersion = Self::column(&self.dispersion_x, n);
        let indices: Vec<usize> = match selector {
            PositionSelector::All => (0..n).collect(),
            PositionSelector::Indices(idx) => {
                if let Some(&bad) = idx.iter().find(|&&i| i >= n) {
                    return Err(TouschekError::PhysicsViolation(format!(
                        "optics index {bad} out of range for {n} positions"
                    )));
                }
                idx.clone()
            }
        };
        let beta_x = Array1::from_iter(indices.iter().map(|&i| self.beta_x[i]));
        if let Some(i) = beta_x.iter().position(|b| !b.is_finite() || *b <= 0.0) {
            return Err(TouschekError::UpstreamOptics {
                energy_offset,
                message: format!("non-physical beta_x at selected index {i}"),
            });
        }
        Ok(Optics {
            positions: Array1::from_iter(indices.iter().map(|&i| self.positions[i])),
            beta_x,
            closed_orbit_x: Array1::from_iter(
                indices
                    .iter()
                    .map(|&i| orbit[i] + dispersion[i] * energy_offset),
            ),
        })
    }

    fn energy_acceptance(&self) -> TouschekResult<EnergyAcceptanceProfile> {
        EnergyAcceptanceProfile::new(
            Array1::from(self.acceptance.positions.clone()),
            Array1::from(self.acceptance.positive.clone()),
            Array1::from(self.acceptance.negative.clone()),
        )
    }

    fn touschek_coefficients(&self) -> TouschekResult<KinematicCoefficients> {
        KinematicCoefficients::new(
            Array1::from(self.b1.clone()),
            Array1::from(self.b2.clone()),
        )
    }

    fn envelopes(&self) -> TouschekResult<Vec<CovarianceMatrix>> {
        self.envelopes
            .iter()
            .enumerate()
            .map(|(i, rows)| {
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                let cov = Array2::from_shape_vec((PHASE_SPACE_DIM, PHASE_SPACE_DIM), flat)
                    .map_err(|e| {
                        TouschekError::ConfigError(format!("envelope {i} has bad shape: {e}"))
                    })?;
                validate_covariance(&cov)?;
                Ok(cov)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::path::PathBuf;

    fn demo_envelope() -> CovarianceMatrix {
        Array2::from_diag(&array![1e-8, 1e-9, 1e-8, 1e-9, 1e-3, 1e-3])
    }

    fn demo_model() -> TabulatedModel {
        TabulatedModel::uniform(
            vec![0.0, 1.0, 2.0, 3.0],
            5.0,
            (0.03, 0.025),
            (600.0, 500.0),
            &demo_envelope(),
        )
        .unwrap()
    }

    #[test]
    fn test_uniform_model_exposes_grid() {
        let model = demo_model();
        let s = model.positions().unwrap();
        assert_eq!(s.to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        let acc = model.energy_acceptance().unwrap();
        assert_eq!(acc.len(), 4);
        assert_eq!(model.touschek_coefficients().unwrap().at(2), (600.0, 500.0));
        let env = model.envelopes().unwrap();
        assert_eq!(env.len(), 4);
        assert_eq!(env[3], demo_envelope());
    }

    #[test]
    fn test_optics_selected_indices() {
        let mut model = demo_model();
        model.dispersion_x = vec![0.1, 0.2, 0.3, 0.4];
        let optics = model
            .optics(&PositionSelector::Indices(vec![3, 1]), 0.01)
            .unwrap();
        assert_eq!(optics.positions.to_vec(), vec![3.0, 1.0]);
        assert!((optics.closed_orbit_x[0] - 0.004).abs() < 1e-15);
        assert!((optics.closed_orbit_x[1] - 0.002).abs() < 1e-15);
    }

    #[test]
    fn test_optics_unstable_offset() {
        let model = demo_model();
        match model.optics(&PositionSelector::All, 0.5).unwrap_err() {
            TouschekError::UpstreamOptics { energy_offset, .. } => {
                assert_eq!(energy_offset, 0.5);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_optics_index_out_of_range() {
        let model = demo_model();
        assert!(model
            .optics(&PositionSelector::Indices(vec![4]), 0.0)
            .is_err());
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let mut model = demo_model();
        model.b2.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_load_demo_ring() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("configs/demo_ring.json");
        let model = TabulatedModel::from_file(&path.to_string_lossy()).unwrap();
        assert!(model.len() >= 2);
        assert!(model.aperture().is_some());
        assert_eq!(model.envelopes().unwrap().len(), model.len());
    }
}
