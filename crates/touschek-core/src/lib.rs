// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Touschek loss engine.
//!
//! Analytic path: acceptance → loss-rate density.
//! Monte Carlo path: pair sampler → cross section → scattering → histograms.
//! Aperture scan and tracking wrap an external optics provider and tracker.

pub mod acceptance;
pub mod amplitude;
pub mod cross_section;
pub mod density;
pub mod histogram;
pub mod model;
pub mod pair_sampler;
pub mod report;
pub mod scattering;
pub mod tracking;
