// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Aperture Amplitude Scan
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Largest horizontal betatron amplitude that fits inside the physical
//! aperture, per energy offset.

use crate::model::{AcceleratorModel, PositionSelector, TabulatedAperture};
use crate::report::SweepReport;
use ndarray::{Array1, ArrayView1};
use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::AmplitudeLimit;

/// Horizontal aperture edges on the optics grid [m].
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    h_min: Array1<f64>,
    h_max: Array1<f64>,
}

impl Aperture {
    pub fn new(h_min: Array1<f64>, h_max: Array1<f64>) -> TouschekResult<Self> {
        if h_min.len() != h_max.len() || h_min.is_empty() {
            return Err(TouschekError::PhysicsViolation(format!(
                "aperture edges need matching non-empty lengths, got {} and {}",
                h_min.len(),
                h_max.len()
            )));
        }
        for (i, (lo, hi)) in h_min.iter().zip(h_max.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(TouschekError::PhysicsViolation(format!(
                    "aperture at index {i} must satisfy h_min < h_max, got [{lo}, {hi}]"
                )));
            }
        }
        Ok(Aperture { h_min, h_max })
    }

    pub fn from_table(table: &TabulatedAperture) -> TouschekResult<Self> {
        Self::new(
            Array1::from(table.h_min.clone()),
            Array1::from(table.h_max.clone()),
        )
    }

    pub fn len(&self) -> usize {
        self.h_min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.h_min.is_empty()
    }

    /// Invariant a = min((h_max − x_co)², (h_min − x_co)²) / β_x at every point.
    pub fn invariants(
        &self,
        beta_x: ArrayView1<f64>,
        closed_orbit_x: ArrayView1<f64>,
    ) -> TouschekResult<Array1<f64>> {
        if beta_x.len() != self.len() || closed_orbit_x.len() != self.len() {
            return Err(TouschekError::PhysicsViolation(format!(
                "optics has {} points but the aperture has {}",
                beta_x.len(),
                self.len()
            )));
        }
        Ok(Array1::from_iter((0..self.len()).map(|i| {
            let co = closed_orbit_x[i];
            let sup = (self.h_max[i] - co).powi(2);
            let inf = (self.h_min[i] - co).powi(2);
            sup.min(inf) / beta_x[i]
        })))
    }
}

/// Limiting amplitude at one energy offset.
pub fn amplitude_at<M: AcceleratorModel + ?Sized>(
    model: &M,
    aperture: &Aperture,
    energy_offset: f64,
) -> TouschekResult<AmplitudeLimit> {
    let optics = model.optics(&PositionSelector::All, energy_offset)?;
    if let Some(i) = optics.beta_x.iter().position(|b| !b.is_finite()) {
        return Err(TouschekError::UpstreamOptics {
            energy_offset,
            message: format!("beta_x is not finite at index {i}"),
        });
    }
    let invariants = aperture.invariants(optics.beta_x.view(), optics.closed_orbit_x.view())?;
    let (limiting_index, &a) = invariants
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .ok_or_else(|| TouschekError::PhysicsViolation("empty optics grid".to_string()))?;
    Ok(AmplitudeLimit {
        energy_offset,
        amplitude: a.sqrt(),
        limiting_index,
    })
}

/// Scan every offset. An unstable offset fails alone.
pub fn aperture_amplitudes<M: AcceleratorModel + ?Sized>(
    model: &M,
    energy_offsets: &[f64],
    aperture: &Aperture,
) -> SweepReport<AmplitudeLimit> {
    let report = SweepReport::collect(energy_offsets, |_, delta| {
        amplitude_at(model, aperture, delta)
    });
    report.log_summary("aperture amplitudes");
    report
}
