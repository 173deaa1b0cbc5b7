// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Sweep Report
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-item results of multi-position and multi-offset sweeps.
//!
//! A failure at one item is stored next to the successes instead of
//! aborting the sweep.

use touschek_types::error::{TouschekError, TouschekResult};

/// Outcome for one requested item.
#[derive(Debug)]
pub struct SweepEntry<T> {
    /// Position of the item in the request.
    pub index: usize,
    /// Requested longitudinal position or energy offset.
    pub key: f64,
    pub outcome: TouschekResult<T>,
}

#[derive(Debug)]
pub struct SweepReport<T> {
    entries: Vec<SweepEntry<T>>,
}

impl<T> SweepReport<T> {
    /// Evaluate `f` for every key; errors are annotated with the item index.
    pub fn collect<F>(keys: &[f64], mut f: F) -> Self
    where
        F: FnMut(usize, f64) -> TouschekResult<T>,
    {
        let entries = keys
            .iter()
            .enumerate()
            .map(|(index, &key)| SweepEntry {
                index,
                key,
                outcome: f(index, key).map_err(|e| e.at_position(index)),
            })
            .collect();
        SweepReport { entries }
    }

    /// Wrap outcomes already ordered by request index.
    pub fn from_outcomes(keys: &[f64], outcomes: Vec<TouschekResult<T>>) -> Self {
        let entries = keys
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (&key, outcome))| SweepEntry {
                index,
                key,
                outcome: outcome.map_err(|e| e.at_position(index)),
            })
            .collect();
        SweepReport { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&SweepEntry<T>, &T)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|v| (e, v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&SweepEntry<T>, &TouschekError)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().err().map(|err| (e, err)))
    }

    pub fn n_failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.n_failed() == 0
    }

    /// All values in request order, or the first failure.
    pub fn into_result(self) -> TouschekResult<Vec<T>> {
        self.entries.into_iter().map(|e| e.outcome).collect()
    }

    /// Info line with the success count, one warning per failed item.
    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{label}: {}/{} items succeeded",
            self.len() - self.n_failed(),
            self.len()
        );
        for (entry, err) in self.failures() {
            log::warn!("{label}: item {} (key {}) failed: {err}", entry.index, entry.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halve_positive(_: usize, key: f64) -> TouschekResult<f64> {
        if key > 0.0 {
            Ok(key / 2.0)
        } else {
            Err(TouschekError::SingularMatrix {
                position: None,
                message: "non-positive key".to_string(),
            })
        }
    }

    #[test]
    fn test_collect_isolates_failures() {
        let report = SweepReport::collect(&[2.0, -1.0, 8.0], halve_positive);
        assert_eq!(report.len(), 3);
        assert_eq!(report.n_failed(), 1);
        let values: Vec<f64> = report.successes().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1.0, 4.0]);
        let (entry, err) = report.failures().next().unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(err.position(), Some(1));
    }

    #[test]
    fn test_into_result_returns_first_failure() {
        let report = SweepReport::collect(&[1.0, 0.0, -3.0], halve_positive);
        let err = report.into_result().unwrap_err();
        assert_eq!(err.position(), Some(1));

        let ok = SweepReport::collect(&[1.0, 4.0], halve_positive);
        assert!(ok.all_succeeded());
        assert_eq!(ok.into_result().unwrap(), vec![0.5, 2.0]);
    }

    #[test]
    fn test_from_outcomes_keeps_existing_position() {
        let outcomes: Vec<TouschekResult<u8>> = vec![
            Ok(1),
            Err(TouschekError::NormalizationFailure {
                position: 7,
                branch: touschek_types::state::Branch::Positive,
                integral: 0.0,
            }),
        ];
        let report = SweepReport::from_outcomes(&[0.5, 1.5], outcomes);
        let (_, err) = report.failures().next().unwrap();
        assert_eq!(err.position(), Some(7));
    }
}
