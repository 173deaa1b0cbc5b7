// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Phase-Space Pair Sampler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Correlated colliding pairs drawn from a local 6D Gaussian.
//!
//! Both particles of a pair sit at the same point (x, y, z). Particle 1 is a
//! draw from the full distribution; particle 2 takes particle 1's location and
//! draws (x', y', δ) from the Gaussian conditioned on that location.

use ndarray::{s, Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use touschek_math::linalg::{cholesky_psd, invert, permute_symmetric};
use touschek_types::error::TouschekResult;
use touschek_types::state::{
    validate_covariance, CovarianceMatrix, ParticleBatch, DELTA, DL, PHASE_SPACE_DIM, X, XP, Y, YP,
};

/// Coordinate order used internally: momentum block first, location block second.
const REORDER: [usize; PHASE_SPACE_DIM] = [XP, YP, DELTA, X, Y, DL];
const BLOCK: usize = 3;

/// Pre-factored sampler for one covariance matrix.
#[derive(Debug, Clone)]
pub struct PairSampler {
    /// Cholesky factor of the reordered joint covariance.
    joint_factor: Array2<f64>,
    /// Σ_mp Σ_pp⁻¹, mapping a location to the conditional momentum mean.
    gain: Array2<f64>,
    /// Cholesky factor of Σ_mm − Σ_mp Σ_pp⁻¹ Σ_pm.
    conditional_factor: Array2<f64>,
}

impl PairSampler {
    /// Factor `cov`. A singular location block is a `SingularMatrix` error.
    pub fn new(cov: &CovarianceMatrix) -> TouschekResult<Self> {
        validate_covariance(cov)?;
        let reordered = permute_symmetric(cov, &REORDER)?;
        let sigma_mm = reordered.slice(s![..BLOCK, ..BLOCK]);
        let sigma_mp = reordered.slice(s![..BLOCK, BLOCK..]);
        let sigma_pm = reordered.slice(s![BLOCK.., ..BLOCK]);
        let sigma_pp = reordered.slice(s![BLOCK.., BLOCK..]).to_owned();

        let gain = sigma_mp.dot(&invert(&sigma_pp)?);
        let conditional = &sigma_mm - &gain.dot(&sigma_pm);
        let conditional = (&conditional + &conditional.t()) * 0.5;

        Ok(PairSampler {
            joint_factor: cholesky_psd(&reordered)?,
            gain,
            conditional_factor: cholesky_psd(&conditional)?,
        })
    }

    /// Draw `n` pairs.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> (ParticleBatch, ParticleBatch) {
        let mut first = ParticleBatch::zeros(n);
        let mut second = ParticleBatch::zeros(n);
        let mut z6 = Array1::<f64>::zeros(PHASE_SPACE_DIM);
        let mut z3 = Array1::<f64>::zeros(BLOCK);

        for i in 0..n {
            z6.mapv_inplace(|_| rng.sample(StandardNormal));
            z3.mapv_inplace(|_| rng.sample(StandardNormal));

            let p1 = self.joint_factor.dot(&z6);
            let location = p1.slice(s![BLOCK..]);
            let momentum2 = self.gain.dot(&location) + self.conditional_factor.dot(&z3);

            // Undo the reorder while writing out.
            for (k, &row) in REORDER.iter().enumerate() {
                first.coords_mut()[[row, i]] = p1[k];
                second.coords_mut()[[row, i]] = if k < BLOCK { momentum2[k] } else { p1[k] };
            }
        }
        (first, second)
    }
}

/// Factor `cov` and draw `n` pairs in one call.
pub fn sample_pairs<R: Rng + ?Sized>(
    cov: &CovarianceMatrix,
    n: usize,
    rng: &mut R,
) -> TouschekResult<(ParticleBatch, ParticleBatch)> {
    Ok(PairSampler::new(cov)?.sample(n, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use touschek_types::error::TouschekError;

    fn diag_cov() -> CovarianceMatrix {
        Array2::from_diag(&array![1e-8, 1e-9, 1e-8, 1e-9, 1e-3, 1e-3])
    }

    fn coupled_cov() -> CovarianceMatrix {
        let mut cov = diag_cov();
        cov[[X, XP]] = -2e-9;
        cov[[XP, X]] = -2e-9;
        cov[[Y, YP]] = 1e-9;
        cov[[YP, Y]] = 1e-9;
        cov
    }

    fn sample_cov(a: ndarray::ArrayView1<f64>, b: ndarray::ArrayView1<f64>) -> f64 {
        let n = a.len() as f64;
        let (ma, mb) = (a.sum() / n, b.sum() / n);
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - ma) * (y - mb))
            .sum::<f64>()
            / (n - 1.0)
    }

    #[test]
    fn test_location_shared_momentum_independent() {
        let mut rng = StdRng::seed_from_u64(7);
        let (p1, p2) = sample_pairs(&diag_cov(), 500, &mut rng).unwrap();
        assert_eq!(p1.len(), 500);
        for axis in [X, Y, DL] {
            assert_eq!(p1.coordinate(axis), p2.coordinate(axis));
        }
        for axis in [XP, YP, DELTA] {
            let c1 = p1.coordinate(axis);
            let c2 = p2.coordinate(axis);
            assert!(c1.iter().zip(c2.iter()).all(|(a, b)| a != b));
        }
    }

    #[test]
    fn test_same_seed_reproduces_draws() {
        let cov = coupled_cov();
        let a = sample_pairs(&cov, 64, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = sample_pairs(&cov, 64, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_marginals_follow_covariance() {
        let cov = coupled_cov();
        let mut rng = StdRng::seed_from_u64(11);
        let (p1, p2) = sample_pairs(&cov, 40_000, &mut rng).unwrap();
        for batch in [&p1, &p2] {
            for (a, b) in [(X, X), (XP, XP), (X, XP), (Y, YP), (DELTA, DELTA)] {
                let got = sample_cov(batch.coordinate(a), batch.coordinate(b));
                let expected = cov[[a, b]];
                let scale = (cov[[a, a]] * cov[[b, b]]).sqrt();
                assert!(
                    (got - expected).abs() < 0.05 * scale,
                    "cov({a},{b}) = {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_conditional_draw_tracks_shared_location() {
        // Strong x-x' coupling: particle 2's x' is pulled toward the same
        // conditional mean as particle 1's, so the two are positively correlated.
        let mut cov = diag_cov();
        cov[[X, XP]] = 0.9 * (1e-8f64 * 1e-9).sqrt();
        cov[[XP, X]] = cov[[X, XP]];
        let mut rng = StdRng::seed_from_u64(5);
        let (p1, p2) = sample_pairs(&cov, 20_000, &mut rng).unwrap();
        let c = sample_cov(p1.coordinate(XP), p2.coordinate(XP)) / 1e-9;
        assert!((c - 0.81).abs() < 0.05, "normalized cov(x'1, x'2) = {c}");
    }

    #[test]
    fn test_singular_location_block() {
        let mut cov = diag_cov();
        cov[[Y, Y]] = 0.0;
        match PairSampler::new(&cov).unwrap_err() {
            TouschekError::SingularMatrix { position, .. } => assert!(position.is_none()),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_momentum_spread_is_allowed() {
        let mut cov = diag_cov();
        cov[[XP, XP]] = 0.0;
        cov[[YP, YP]] = 0.0;
        let (p1, p2) = sample_pairs(&cov, 10, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(p1.coordinate(XP).iter().all(|&v| v == 0.0));
        assert!(p2.coordinate(YP).iter().all(|&v| v == 0.0));
    }
}
