// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Bessel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Exponentially scaled modified Bessel function of order zero.
//!
//! Uses Abramowitz & Stegun polynomial approximations (Handbook of
//! Mathematical Functions, 9.8.1 and 9.8.2). Matches
//! `scipy.special.i0e(x) = exp(-|x|) I0(x)` to about 4e-7 relative.

/// Crossover between the small-argument and asymptotic forms.
const CROSSOVER: f64 = 3.75;

/// Exponentially scaled modified Bessel function I0e(x).
///
/// Finite for every finite argument; the Touschek density evaluates it at
/// b2·τ, which reaches 1e6 and beyond near κ → π/2.
pub fn i0e(x: f64) -> f64 {
    let ax = x.abs();
    if ax < CROSSOVER {
        // A&S 9.8.1
        let y = (x / CROSSOVER).powi(2);
        let poly = 1.0
            + y * (3.515_622_9
                + y * (3.089_942_4
                    + y * (1.206_749_2 + y * (0.265_973_2 + y * (0.036_076_8 + y * 0.004_581_3)))));
        (-ax).exp() * poly
    } else {
        // A&S 9.8.2
        let y = CROSSOVER / ax;
        let poly = 0.398_942_28
            + y * (0.013_285_92
                + y * (0.002_253_19
                    + y * (-0.001_575_65
                        + y * (0.009_162_81
                            + y * (-0.020_577_06
                                + y * (0.026_355_37 + y * (-0.016_476_33 + y * 0.003_923_77)))))));
        poly / ax.sqrt()
    }
}
