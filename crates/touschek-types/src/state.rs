// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{TouschekError, TouschekResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row indices of the 6D phase-space coordinates inside a [`ParticleBatch`].
pub const X: usize = 0;
pub const XP: usize = 1;
pub const Y: usize = 2;
pub const YP: usize = 3;
pub const DELTA: usize = 4;
pub const DL: usize = 5;

/// Number of phase-space coordinates.
pub const PHASE_SPACE_DIM: usize = 6;

/// Sign of the energy-deviation branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// Particle gains energy (checked against the positive acceptance).
    Positive,
    /// Particle loses energy (checked against the negative acceptance).
    Negative,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Positive => write!(f, "positive"),
            Branch::Negative => write!(f, "negative"),
        }
    }
}

/// Batch of 6D particle states stored attribute-major: row `c` holds
/// coordinate `c` (x, x', y, y', δ, z) of every particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBatch {
    coords: Array2<f64>,
}

impl ParticleBatch {
    pub fn zeros(n_particles: usize) -> Self {
        ParticleBatch {
            coords: Array2::zeros((PHASE_SPACE_DIM, n_particles)),
        }
    }

    /// Wrap a `[6, n]` coordinate array.
    pub fn from_coords(coords: Array2<f64>) -> TouschekResult<Self> {
        if coords.nrows() != PHASE_SPACE_DIM {
            return Err(TouschekError::PhysicsViolation(format!(
                "particle batch needs {PHASE_SPACE_DIM} coordinate rows, got {}",
                coords.nrows()
            )));
        }
        Ok(ParticleBatch { coords })
    }

    pub fn len(&self) -> usize {
        self.coords.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.ncols() == 0
    }

    /// All values of one coordinate, indexed by particle.
    pub fn coordinate(&self, axis: usize) -> ArrayView1<'_, f64> {
        self.coords.row(axis)
    }

    pub fn coordinate_mut(&mut self, axis: usize) -> ArrayViewMut1<'_, f64> {
        self.coords.row_mut(axis)
    }

    /// State of a single particle.
    pub fn particle(&self, index: usize) -> [f64; PHASE_SPACE_DIM] {
        let col = self.coords.column(index);
        [col[0], col[1], col[2], col[3], col[4], col[5]]
    }

    pub fn coords(&self) -> &Array2<f64> {
        &self.coords
    }

    pub fn coords_mut(&mut self) -> &mut Array2<f64> {
        &mut self.coords
    }
}

/// Positive and negative energy acceptance along the ring.
/// Limits are stored as non-negative magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAcceptanceProfile {
    pub positions: Array1<f64>,
    pub positive: Array1<f64>,
    pub negative: Array1<f64>,
}

impl EnergyAcceptanceProfile {
    pub fn new(
        positions: Array1<f64>,
        positive: Array1<f64>,
        negative: Array1<f64>,
    ) -> TouschekResult<Self> {
        let n = positions.len();
        if positive.len() != n || negative.len() != n {
            return Err(TouschekError::ConfigError(format!(
                "acceptance length mismatch: positions={n}, positive={}, negative={}",
                positive.len(),
                negative.len()
            )));
        }
        if n < 2 {
            return Err(TouschekError::ConfigError(format!(
                "acceptance profile needs at least 2 positions, got {n}"
            )));
        }
        if positions.iter().any(|s| !s.is_finite()) {
            return Err(TouschekError::ConfigError(
                "acceptance positions must be finite".to_string(),
            ));
        }
        if let Some(i) = (1..n).find(|&i| positions[i] <= positions[i - 1]) {
            return Err(TouschekError::ConfigError(format!(
                "acceptance positions must be strictly increasing (index {i})"
            )));
        }
        for (label, limits) in [("positive", &positive), ("negative", &negative)] {
            if let Some(i) = limits.iter().position(|a| !a.is_finite() || *a < 0.0) {
                return Err(TouschekError::ConfigError(format!(
                    "{label} acceptance must be finite and >= 0, got {} at index {i}",
                    limits[i]
                )));
            }
        }
        Ok(EnergyAcceptanceProfile {
            positions,
            positive,
            negative,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Acceptance magnitude of one branch at grid index `index`.
    pub fn limit(&self, branch: Branch, index: usize) -> f64 {
        match branch {
            Branch::Positive => self.positive[index],
            Branch::Negative => self.negative[index],
        }
    }
}

/// Touschek kinematic coefficients B1, B2 indexed like the optics grid.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicCoefficients {
    pub b1: Array1<f64>,
    pub b2: Array1<f64>,
}

impl KinematicCoefficients {
    pub fn new(b1: Array1<f64>, b2: Array1<f64>) -> TouschekResult<Self> {
        if b1.len() != b2.len() {
            return Err(TouschekError::ConfigError(format!(
                "coefficient length mismatch: b1={}, b2={}",
                b1.len(),
                b2.len()
            )));
        }
        for (i, (&c1, &c2)) in b1.iter().zip(b2.iter()).enumerate() {
            if !c1.is_finite() || !c2.is_finite() || c2 < 0.0 || c1 < c2 {
                return Err(TouschekError::ConfigError(format!(
                    "coefficients must satisfy b1 >= b2 >= 0 at index {i}, got b1={c1}, b2={c2}"
                )));
            }
        }
        Ok(KinematicCoefficients { b1, b2 })
    }

    pub fn len(&self) -> usize {
        self.b1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b1.is_empty()
    }

    pub fn at(&self, index: usize) -> (f64, f64) {
        (self.b1[index], self.b2[index])
    }
}

/// 6×6 second-moment matrix over (x, x', y, y', δ, z).
pub type CovarianceMatrix = Array2<f64>;

/// Check shape, finiteness and symmetry of a covariance matrix.
pub fn validate_covariance(cov: &CovarianceMatrix) -> TouschekResult<()> {
    if cov.dim() != (PHASE_SPACE_DIM, PHASE_SPACE_DIM) {
        return Err(TouschekError::PhysicsViolation(format!(
            "covariance must be {PHASE_SPACE_DIM}x{PHASE_SPACE_DIM}, got {:?}",
            cov.dim()
        )));
    }
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(TouschekError::PhysicsViolation(
            "covariance contains non-finite entries".to_string(),
        ));
    }
    for i in 0..PHASE_SPACE_DIM {
        if cov[[i, i]] < 0.0 {
            return Err(TouschekError::PhysicsViolation(format!(
                "covariance diagonal must be >= 0, got {} at {i}",
                cov[[i, i]]
            )));
        }
        for j in (i + 1)..PHASE_SPACE_DIM {
            let scale = cov[[i, j]].abs().max(cov[[j, i]].abs()).max(f64::MIN_POSITIVE);
            if (cov[[i, j]] - cov[[j, i]]).abs() > 1e-9 * scale {
                return Err(TouschekError::PhysicsViolation(format!(
                    "covariance must be symmetric, ({i},{j})={} vs ({j},{i})={}",
                    cov[[i, j]],
                    cov[[j, i]]
                )));
            }
        }
    }
    Ok(())
}

/// Linear optics on the model grid at one energy offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Optics {
    pub positions: Array1<f64>,
    pub beta_x: Array1<f64>,
    pub closed_orbit_x: Array1<f64>,
}

/// Per-trial scattering angles.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringAngles {
    pub phi: Array1<f64>, // azimuth, uniform on [0, 2π)
    pub psi: Array1<f64>, // polar angle from the cross-section CDF
    pub chi: Array1<f64>, // half the transverse-angle separation
}

/// Normalized analytic loss-rate density at one requested position.
#[derive(Debug, Clone, PartialEq)]
pub struct LossDensity {
    pub requested_position: f64,
    pub acceptance_index: usize,
    pub model_index: usize,
    pub delta_positive: Array1<f64>,
    pub density_positive: Array1<f64>,
    pub delta_negative: Array1<f64>,
    pub density_negative: Array1<f64>,
}

/// Monte Carlo lost-particle energy deviations [%] at one requested position.
#[derive(Debug, Clone, PartialEq)]
pub struct LossHistogram {
    pub requested_position: f64,
    pub model_index: usize,
    pub acceptance_index: usize,
    pub lost_positive_pct: Vec<f64>,
    pub lost_negative_pct: Vec<f64>,
}

/// Aperture-limited amplitude at one energy offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeLimit {
    pub energy_offset: f64,
    pub amplitude: f64,
    pub limiting_index: usize,
}

/// Particles that did not survive a tracking run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackedLosses {
    pub turn_lost: Vec<usize>,
    pub element_lost: Vec<usize>,
    pub energy_deviation: Vec<f64>,
}
