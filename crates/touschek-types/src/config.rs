// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    ACCEPTANCE_GRID_STEP_M, CROSS_SECTION_LOG_SPAN_RAD, CROSS_SECTION_POINTS, DENSITY_POINTS,
    ELECTRON_REST_ENERGY_EV, FIXED_ENERGY_CUTOFF, NOMINAL_BEAM_ENERGY_EV,
};
use crate::error::{TouschekError, TouschekResult};
use serde::{Deserialize, Serialize};

/// Top-level analysis configuration.
/// Every section may be omitted from the JSON file; missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TouschekConfig {
    #[serde(default)]
    pub beam: BeamParams,
    #[serde(default)]
    pub acceptance: AcceptanceParams,
    #[serde(default)]
    pub density: DensityParams,
    #[serde(default)]
    pub cross_section: CrossSectionParams,
    #[serde(default)]
    pub monte_carlo: MonteCarloParams,
}

/// Nominal beam energy and the derived relativistic factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamParams {
    /// Beam energy [eV] (default: 3 GeV)
    #[serde(default = "default_energy_ev")]
    pub energy_ev: f64,
}

impl BeamParams {
    pub fn gamma(&self) -> f64 {
        self.energy_ev / ELECTRON_REST_ENERGY_EV
    }

    pub fn beta(&self) -> f64 {
        let gamma = self.gamma();
        (1.0 - 1.0 / (gamma * gamma)).sqrt()
    }
}

impl Default for BeamParams {
    fn default() -> Self {
        BeamParams {
            energy_ev: default_energy_ev(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceParams {
    /// Nominal step of the resampled acceptance grid [m] (default: 0.1)
    #[serde(default = "default_acceptance_step")]
    pub step_m: f64,
}

impl Default for AcceptanceParams {
    fn default() -> Self {
        AcceptanceParams {
            step_m: default_acceptance_step(),
        }
    }
}

/// How the analytic density is scaled before numerical normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityScaling {
    /// Bare Piwinski integrand times the Bessel term.
    Raw,
    /// Multiplied by 2·sqrt(π(b1² − b2²))·τ_min so positions can be compared.
    PositionComparable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityParams {
    /// Number of κ points per branch (default: 1000)
    #[serde(default = "default_density_points")]
    pub points: usize,
    /// Zero the negative boundary artifact after normalization (default: true)
    #[serde(default = "default_true")]
    pub clip_negative: bool,
    #[serde(default = "default_scaling")]
    pub scaling: DensityScaling,
}

impl Default for DensityParams {
    fn default() -> Self {
        DensityParams {
            points: default_density_points(),
            clip_negative: true,
            scaling: default_scaling(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionParams {
    /// Polar-angle grid points (default: 3000)
    #[serde(default = "default_cross_section_points")]
    pub points: usize,
    /// Upper end of the log-spaced (π/2 − ψ) grid [rad] (default: 1.0)
    #[serde(default = "default_log_span")]
    pub log_span_rad: f64,
}

impl Default for CrossSectionParams {
    fn default() -> Self {
        CrossSectionParams {
            points: default_cross_section_points(),
            log_span_rad: default_log_span(),
        }
    }
}

/// Loss classification rule applied after scattering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CutoffPolicy {
    /// Compare against the resampled acceptance at the scattering position.
    LocalAcceptance,
    /// Flat ±threshold on the energy deviation.
    Fixed { threshold: f64 },
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        CutoffPolicy::Fixed {
            threshold: FIXED_ENERGY_CUTOFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParams {
    /// Particle pairs per position (default: 10000)
    #[serde(default = "default_particles")]
    pub particles: usize,
    /// Minimum energy deviation of interest, sets ψ_min (default: 0.01)
    #[serde(default = "default_de_min")]
    pub de_min: f64,
    /// Base RNG seed; position i uses seed + i (default: 42)
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub cutoff: CutoffPolicy,
    /// Spread positions over the rayon pool (default: true)
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        MonteCarloParams {
            particles: default_particles(),
            de_min: default_de_min(),
            seed: default_seed(),
            cutoff: CutoffPolicy::default(),
            parallel: true,
        }
    }
}

fn default_energy_ev() -> f64 {
    NOMINAL_BEAM_ENERGY_EV
}
fn default_acceptance_step() -> f64 {
    ACCEPTANCE_GRID_STEP_M
}
fn default_density_points() -> usize {
    DENSITY_POINTS
}
fn default_scaling() -> DensityScaling {
    DensityScaling::PositionComparable
}
fn default_cross_section_points() -> usize {
    CROSS_SECTION_POINTS
}
fn default_log_span() -> f64 {
    CROSS_SECTION_LOG_SPAN_RAD
}
fn default_particles() -> usize {
    10_000
}
fn default_de_min() -> f64 {
    0.01
}
fn default_seed() -> u64 {
    42
}
fn default_true() -> bool {
    true
}

impl TouschekConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> TouschekResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TouschekResult<()> {
        if !self.beam.energy_ev.is_finite() || self.beam.energy_ev <= ELECTRON_REST_ENERGY_EV {
            return Err(TouschekError::ConfigError(format!(
                "beam.energy_ev must exceed the electron rest energy, got {}",
                self.beam.energy_ev
            )));
        }
        if !self.acceptance.step_m.is_finite() || self.acceptance.step_m <= 0.0 {
            return Err(TouschekError::ConfigError(format!(
                "acceptance.step_m must be finite and > 0, got {}",
                self.acceptance.step_m
            )));
        }
        if self.density.points < 2 {
            return Err(TouschekError::ConfigError(format!(
                "density.points must be >= 2, got {}",
                self.density.points
            )));
        }
        if self.cross_section.points < 2 {
            return Err(TouschekError::ConfigError(format!(
                "cross_section.points must be >= 2, got {}",
                self.cross_section.points
            )));
        }
        let span = self.cross_section.log_span_rad;
        if !span.is_finite() || span <= 0.0 || span > std::f64::consts::FRAC_PI_2 {
            return Err(TouschekError::ConfigError(format!(
                "cross_section.log_span_rad must be in (0, pi/2], got {span}"
            )));
        }
        if self.monte_carlo.particles == 0 {
            return Err(TouschekError::ConfigError(
                "monte_carlo.particles must be >= 1".to_string(),
            ));
        }
        if !self.monte_carlo.de_min.is_finite() || self.monte_carlo.de_min <= 0.0 {
            return Err(TouschekError::ConfigError(format!(
                "monte_carlo.de_min must be finite and > 0, got {}",
                self.monte_carlo.de_min
            )));
        }
        if let CutoffPolicy::Fixed { threshold } = self.monte_carlo.cutoff {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(TouschekError::ConfigError(format!(
                    "monte_carlo.cutoff.threshold must be finite and >= 0, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/touschek-types/, sample configs
    /// live two levels up.
    fn config_path(relative: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(relative)
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_load_default_config() {
        let cfg = TouschekConfig::from_file(&config_path("configs/touschek_default.json")).unwrap();
        assert!((cfg.beam.energy_ev - 3.0e9).abs() < 1.0);
        assert!((cfg.acceptance.step_m - 0.1).abs() < 1e-12);
        assert_eq!(cfg.density.points, 1000);
        assert!(cfg.density.clip_negative);
        assert_eq!(cfg.density.scaling, DensityScaling::PositionComparable);
        assert_eq!(cfg.cross_section.points, 3000);
        assert_eq!(cfg.monte_carlo.particles, 10_000);
        assert_eq!(
            cfg.monte_carlo.cutoff,
            CutoffPolicy::Fixed { threshold: 0.01 }
        );
    }

    #[test]
    fn test_load_local_acceptance_config() {
        let cfg =
            TouschekConfig::from_file(&config_path("configs/touschek_local_acceptance.json"))
                .unwrap();
        assert_eq!(cfg.monte_carlo.cutoff, CutoffPolicy::LocalAcceptance);
        assert_eq!(cfg.monte_carlo.seed, 2023);
        assert!(!cfg.monte_carlo.parallel);
    }

    #[test]
    fn test_empty_json_takes_defaults() {
        let cfg: TouschekConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TouschekConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_section_takes_field_defaults() {
        let cfg: TouschekConfig =
            serde_json::from_str(r#"{"monte_carlo": {"particles": 500}}"#).unwrap();
        assert_eq!(cfg.monte_carlo.particles, 500);
        assert!((cfg.monte_carlo.de_min - 0.01).abs() < 1e-15);
        assert!(cfg.monte_carlo.parallel);
    }

    #[test]
    fn test_beam_factors_for_3_gev() {
        let beam = BeamParams::default();
        assert!((beam.gamma() - 5870.85).abs() < 0.1, "gamma = {}", beam.gamma());
        assert!(beam.beta() < 1.0);
        assert!((1.0 - beam.beta()) < 2e-8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = TouschekConfig::default();
        cfg.monte_carlo.de_min = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = TouschekConfig::default();
        cfg.cross_section.log_span_rad = 2.0;
        assert!(cfg.validate().is_err());

        let mut cfg = TouschekConfig::default();
        cfg.monte_carlo.cutoff = CutoffPolicy::Fixed { threshold: f64::NAN };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = TouschekConfig::from_file(&config_path("configs/touschek_default.json")).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: TouschekConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, cfg2);
    }
}
