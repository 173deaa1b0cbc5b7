// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Scattered-Electron Tracking
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Launch off-momentum electrons on the closed orbit and keep the ones the
//! ring loses.
//!
//! The tracker itself lives behind [`TrackingEngine`]; this module only
//! builds initial conditions and filters the outcome.

use touschek_types::error::{TouschekError, TouschekResult};
use touschek_types::state::{ParticleBatch, TrackedLosses, DELTA, PHASE_SPACE_DIM, X, Y};

/// Where each particle of a ring pass was lost. Survivors report the last
/// turn and the starting element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackingOutcome {
    pub turn_lost: Vec<usize>,
    pub element_lost: Vec<usize>,
}

/// Multi-turn element-by-element tracker.
pub trait TrackingEngine {
    /// 6D closed orbit at the entrance of `element_idx`.
    fn closed_orbit(&self, element_idx: usize) -> TouschekResult<[f64; PHASE_SPACE_DIM]>;

    /// Track `initial` for `n_turns`, starting at `element_offset`.
    fn ring_pass(
        &self,
        initial: &ParticleBatch,
        n_turns: usize,
        element_offset: usize,
    ) -> TouschekResult<TrackingOutcome>;
}

/// Small transverse offset added at launch so particles do not sit exactly
/// on the closed orbit [m].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchKick {
    pub x: f64,
    pub y: f64,
}

impl Default for LaunchKick {
    fn default() -> Self {
        LaunchKick { x: 1e-5, y: 3e-6 }
    }
}

/// Closed orbit at `element_idx` plus the kick, with each particle's
/// energy deviation added to δ.
pub fn launch_conditions(
    orbit: &[f64; PHASE_SPACE_DIM],
    deltas: &[f64],
    kick: LaunchKick,
) -> ParticleBatch {
    let mut batch = ParticleBatch::zeros(deltas.len());
    for (axis, &value) in orbit.iter().enumerate() {
        batch.coordinate_mut(axis).fill(value);
    }
    batch.coordinate_mut(X).mapv_inplace(|v| v + kick.x);
    batch.coordinate_mut(Y).mapv_inplace(|v| v + kick.y);
    for (d, &delta) in batch.coordinate_mut(DELTA).iter_mut().zip(deltas) {
        *d += delta;
    }
    batch
}

/// Track one electron per entry of `deltas` from `element_idx` and return
/// those that did not complete `n_turns`.
pub fn track_scattered_electrons<E: TrackingEngine + ?Sized>(
    engine: &E,
    deltas: &[f64],
    n_turns: usize,
    element_idx: usize,
    kick: LaunchKick,
) -> TouschekResult<TrackedLosses> {
    if n_turns == 0 {
        return Err(TouschekError::PhysicsViolation(
            "n_turns must be at least 1".to_string(),
        ));
    }
    if let Some(bad) = deltas.iter().find(|d| !d.is_finite()) {
        return Err(TouschekError::PhysicsViolation(format!(
            "energy deviations must be finite, got {bad}"
        )));
    }
    if !kick.x.is_finite() || !kick.y.is_finite() {
        return Err(TouschekError::PhysicsViolation(format!(
            "launch kick must be finite, got ({}, {})",
            kick.x, kick.y
        )));
    }

    let orbit = engine.closed_orbit(element_idx)?;
    let initial = launch_conditions(&orbit, deltas, kick);
    let outcome = engine.ring_pass(&initial, n_turns, element_idx)?;
    if outcome.turn_lost.len() != deltas.len() || outcome.element_lost.len() != deltas.len() {
        return Err(TouschekError::PhysicsViolation(format!(
            "tracker returned {} turns and {} elements for {} particles",
            outcome.turn_lost.len(),
            outcome.element_lost.len(),
            deltas.len()
        )));
    }

    let mut losses = TrackedLosses::default();
    for (i, &delta) in deltas.iter().enumerate() {
        let (turn, element) = (outcome.turn_lost[i], outcome.element_lost[i]);
        if turn == n_turns && element == element_idx {
            continue;
        }
        losses.turn_lost.push(turn);
        losses.element_lost.push(element);
        losses.energy_deviation.push(delta);
    }
    log::debug!(
        "tracked {} electrons from element {element_idx} for {n_turns} turns: {} lost",
        deltas.len(),
        losses.turn_lost.len()
    );
    Ok(losses)
}
