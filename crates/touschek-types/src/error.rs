// ─────────────────────────────────────────────────────────────────────
// Touschek Loss Core — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::state::Branch;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TouschekError {
    #[error("Singular matrix ({}): {message}", site(.position, &None))]
    SingularMatrix {
        position: Option<usize>,
        message: String,
    },

    #[error("Degenerate scattering angle ({}): {message}", site(.position, .branch))]
    DegenerateAngle {
        position: Option<usize>,
        branch: Option<Branch>,
        message: String,
    },

    #[error("Density normalization failed at position {position} ({branch} branch): integral = {integral}")]
    NormalizationFailure {
        position: usize,
        branch: Branch,
        integral: f64,
    },

    #[error("Upstream optics failure at energy offset {energy_offset}: {message}")]
    UpstreamOptics { energy_offset: f64, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TouschekResult<T> = Result<T, TouschekError>;

fn site(position: &Option<usize>, branch: &Option<Branch>) -> String {
    match (position, branch) {
        (Some(p), Some(b)) => format!("position {p}, {b} branch"),
        (Some(p), None) => format!("position {p}"),
        (None, Some(b)) => format!("{b} branch"),
        (None, None) => "no position context".to_string(),
    }
}

impl TouschekError {
    /// Attach a position index to errors raised below the position loop.
    /// Context that is already present is kept.
    pub fn at_position(self, index: usize) -> Self {
        match self {
            TouschekError::SingularMatrix {
                position: None,
                message,
            } => TouschekError::SingularMatrix {
                position: Some(index),
                message,
            },
            TouschekError::DegenerateAngle {
                position: None,
                branch,
                message,
            } => TouschekError::DegenerateAngle {
                position: Some(index),
                branch,
                message,
            },
            other => other,
        }
    }

    /// Attach the acceptance branch to a degenerate-angle error.
    pub fn on_branch(self, sign: Branch) -> Self {
        match self {
            TouschekError::DegenerateAngle {
                position,
                branch: None,
                message,
            } => TouschekError::DegenerateAngle {
                position,
                branch: Some(sign),
                message,
            },
            other => other,
        }
    }

    /// Position index carried by the error, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            TouschekError::SingularMatrix { position, .. }
            | TouschekError::DegenerateAngle { position, .. } => *position,
            TouschekError::NormalizationFailure { position, .. } => Some(*position),
            _ => None,
        }
    }
}
