// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Electron rest energy (eV).
pub const ELECTRON_REST_ENERGY_EV: f64 = 0.510_998_95e6;

/// Nominal storage-ring beam energy (eV). 3 GeV electron ring.
pub const NOMINAL_BEAM_ENERGY_EV: f64 = 3.0e9;

/// Longitudinal step of the resampled acceptance grid [m].
pub const ACCEPTANCE_GRID_STEP_M: f64 = 0.1;

/// Fixed energy-deviation cutoff used when the local acceptance is ignored.
pub const FIXED_ENERGY_CUTOFF: f64 = 0.01;

/// Default number of polar-angle grid points for the cross-section CDF.
pub const CROSS_SECTION_POINTS: usize = 3000;

/// Upper end of the log-spaced (π/2 − ψ) grid [rad].
pub const CROSS_SECTION_LOG_SPAN_RAD: f64 = 1.0;

/// Relative velocity below which the general Møller term is dropped.
pub const NEGLIGIBLE_RELATIVE_VELOCITY: f64 = 1e-19;

/// Default number of κ points for the analytic loss-rate density.
pub const DENSITY_POINTS: usize = 1000;

/// Energy deviation to percent.
pub const PERCENT: f64 = 1e2;
