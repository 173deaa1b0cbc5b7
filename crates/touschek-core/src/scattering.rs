// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Scattering Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Relativistic two-body Touschek collision of sampled particle pairs.
//!
//! Each pair is moved into its collision frame: j along the total momentum,
//! k normal to the plane of the two momenta, l = j × k. In that frame the
//! incoming momenta are (cos χ, ±sin χ, 0); the outgoing ones are
//! (cos χ, 0, 0) ± Δp with Δp set by the polar angle ψ and azimuth φ
//! (Piwinski, eq. 16). The result is rotated back to the lab frame and the
//! new energy deviation is |p| − 1.

use crate::cross_section::CrossSectionDistribution;
use ndarray::Array1;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, TAU};
use touschek_types::config::{BeamParams, CrossSectionParams, TouschekConfig};
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::{ParticleBatch, ScatteringAngles, DELTA, XP, YP};

const MIN_FRAME_NORM: f64 = 1e-300;

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn unit(a: [f64; 3]) -> Option<[f64; 3]> {
    let n = dot(a, a).sqrt();
    if !n.is_finite() || n <= MIN_FRAME_NORM {
        return None;
    }
    Some([a[0] / n, a[1] / n, a[2] / n])
}

/// Normalized momentum (x', y', p_z) of one particle.
fn momentum(state: &[f64; 6]) -> [f64; 3] {
    let (xp, yp, delta) = (state[XP], state[YP], state[DELTA]);
    let pz = ((1.0 + delta).powi(2) - xp * xp - yp * yp).sqrt();
    [xp, yp, pz]
}

/// Orthonormal collision frame of one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionFrame {
    pub j: [f64; 3],
    pub k: [f64; 3],
    pub l: [f64; 3],
}

impl CollisionFrame {
    /// `None` when the momenta are parallel, opposite or non-finite.
    pub fn new(p1: [f64; 3], p2: [f64; 3]) -> Option<Self> {
        let j = unit([p1[0] + p2[0], p1[1] + p2[1], p1[2] + p2[2]])?;
        let k = unit(cross(p1, p2))?;
        let l = cross(j, k);
        Some(CollisionFrame { j, k, l })
    }

    /// Rotate frame components (along j, k, l) into lab coordinates.
    pub fn to_lab(&self, v: [f64; 3]) -> [f64; 3] {
        [
            self.j[0] * v[0] + self.k[0] * v[1] + self.l[0] * v[2],
            self.j[1] * v[0] + self.k[1] * v[1] + self.l[1] * v[2],
            self.j[2] * v[0] + self.k[2] * v[1] + self.l[2] * v[2],
        ]
    }
}

/// Scattered pairs and per-batch diagnostics.
#[derive(Debug, Clone)]
pub struct ScatterOutcome {
    pub particle1: ParticleBatch,
    pub particle2: ParticleBatch,
    pub angles: ScatteringAngles,
    /// Largest polar angle kept in the cross section.
    pub psi_min: f64,
    /// 2ψ_min/π, the share of the polar range kept.
    pub solid_angle_fraction: f64,
    /// Pairs left unscattered because their frame was undefined.
    pub degenerate_frames: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ScatteringEngine {
    gamma: f64,
    beta: f64,
    /// Relative velocity of the colliding pair; zero in the ultra-relativistic limit.
    beta_bar: f64,
    cross_section: CrossSectionParams,
}

impl ScatteringEngine {
    pub fn new(beam: &BeamParams, cross_section: CrossSectionParams) -> Self {
        ScatteringEngine {
            gamma: beam.gamma(),
            beta: beam.beta(),
            beta_bar: 0.0,
            cross_section,
        }
    }

    pub fn from_config(config: &TouschekConfig) -> Self {
        Self::new(&config.beam, config.cross_section)
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// ψ_min = arccos(de_min / (2 γ χ_max)).
    ///
    /// The largest χ of the batch gives the widest ψ range able to produce
    /// an energy deviation of at least `de_min`.
    pub fn limiting_angle(&self, chi_max: f64, de_min: f64) -> TouschekResult<f64> {
        if !de_min.is_finite() || de_min <= 0.0 {
            return Err(TouschekError::PhysicsViolation(format!(
                "de_min must be finite and > 0, got {de_min}"
            )));
        }
        if !chi_max.is_finite() || chi_max <= 0.0 {
            return Err(TouschekError::DegenerateAngle {
                position: None,
                branch: None,
                message: format!("chi_max = {chi_max}, the pairs have no transverse angle spread"),
            });
        }
        let arg = de_min / self.gamma / (2.0 * chi_max);
        if arg.is_nan() || arg <= 0.0 || arg >= 1.0 {
            return Err(TouschekError::DegenerateAngle {
                position: None,
                branch: None,
                message: format!(
                    "arccos argument {arg} outside (0, 1) for de_min = {de_min}, chi_max = {chi_max}"
                ),
            });
        }
        Ok(arg.acos())
    }

    /// Scatter every pair once. Only x', y' and δ change.
    pub fn scatter<R: Rng + ?Sized>(
        &self,
        particle1: &ParticleBatch,
        particle2: &ParticleBatch,
        de_min: f64,
        rng: &mut R,
    ) -> TouschekResult<ScatterOutcome> {
        let n = particle1.len();
        if particle2.len() != n {
            return Err(TouschekError::PhysicsViolation(format!(
                "pair batches differ in size: {n} vs {}",
                particle2.len()
            )));
        }

        let chi: Array1<f64> = (0..n)
            .map(|i| {
                let theta = particle1.coordinate(XP)[i] - particle2.coordinate(XP)[i];
                let zeta = particle1.coordinate(YP)[i] - particle2.coordinate(YP)[i];
                0.5 * theta.hypot(zeta)
            })
            .collect();
        if let Some(i) = chi.iter().position(|c| !c.is_finite()) {
            return Err(TouschekError::PhysicsViolation(format!(
                "non-finite transverse angle in pair {i}"
            )));
        }
        let chi_max = chi.iter().copied().fold(0.0_f64, f64::max);
        let psi_min = self.limiting_angle(chi_max, de_min)?;
        let solid_angle_fraction = psi_min / FRAC_PI_2;
        log::debug!("psi_min = {psi_min:.6}, solid-angle fraction = {solid_angle_fraction:.6}");

        let phi = Array1::from_iter((0..n).map(|_| rng.gen::<f64>() * TAU));
        let distribution =
            CrossSectionDistribution::new(psi_min, self.beta_bar, &self.cross_section)?;
        let psi = distribution.sample(n, rng);

        let mut out1 = particle1.clone();
        let mut out2 = particle2.clone();
        let beta_gamma = self.beta * self.gamma;
        let mut degenerate_frames = 0usize;

        for i in 0..n {
            let frame = match CollisionFrame::new(
                momentum(&particle1.particle(i)),
                momentum(&particle2.particle(i)),
            ) {
                Some(frame) => frame,
                None => {
                    degenerate_frames += 1;
                    continue;
                }
            };
            let c = chi[i];
            let gamma_t = self.gamma / (1.0 + beta_gamma * beta_gamma * c * c).sqrt();
            let (sin_psi, cos_psi) = psi[i].sin_cos();
            let (sin_phi, cos_phi) = phi[i].sin_cos();
            let dp = [
                c.sin() * gamma_t * cos_psi,
                c.sin() * sin_psi * cos_phi,
                c.sin() * sin_psi * sin_phi,
            ];
            let lab1 = frame.to_lab([c.cos() + dp[0], dp[1], dp[2]]);
            let lab2 = frame.to_lab([c.cos() - dp[0], -dp[1], -dp[2]]);

            for (batch, lab) in [(&mut out1, lab1), (&mut out2, lab2)] {
                let coords = batch.coords_mut();
                coords[[XP, i]] = lab[0];
                coords[[YP, i]] = lab[1];
                coords[[DELTA, i]] = dot(lab, lab).sqrt() - 1.0;
            }
        }
        if degenerate_frames > 0 {
            log::debug!("{degenerate_frames} of {n} pairs left unscattered (degenerate frame)");
        }

        Ok(ScatterOutcome {
            particle1: out1,
            particle2: out2,
            angles: ScatteringAngles { phi, psi, chi },
            psi_min,
            solid_angle_fraction,
            degenerate_frames,
        })
    }
}
