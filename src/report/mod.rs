//! Reporting utilities: solution errors and formatted terminal output.

pub mod format;

pub use format::*;

use nalgebra::{DMatrix, DVector};

use crate::error::EstimatorError;

/// Format a vector as `[+1.0000, -0.5000]`.
pub fn pretty(v: &DVector<f64>) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:+.4}")).collect();
    format!("[{}]", parts.join(", "))
}

/// Causal and non-causal error of an estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionErrors {
    /// Mean squared difference over entries where the true solution is non-zero.
    pub causal: f64,
    /// Mean squared difference over entries where the true solution is zero.
    pub noncausal: f64,
}

/// Map `estimate` back through `scramble` and score it against `truth`.
///
/// Returns the unscrambled estimate alongside its errors. An empty group scores 0.
pub fn solution_errors(
    truth: &DVector<f64>,
    scramble: &DMatrix<f64>,
    estimate: &DVector<f64>,
) -> Result<(DVector<f64>, SolutionErrors), EstimatorError> {
    if scramble.ncols() != estimate.len() {
        return Err(EstimatorError::DimensionMismatch {
            context: "estimate vs scramble columns".to_string(),
            expected: scramble.ncols(),
            found: estimate.len(),
        });
    }
    if scramble.nrows() != truth.len() {
        return Err(EstimatorError::DimensionMismatch {
            context: "true solution vs scramble rows".to_string(),
            expected: scramble.nrows(),
            found: truth.len(),
        });
    }

    let unscrambled = scramble * estimate;

    let (mut causal, mut n_causal) = (0.0, 0usize);
    let (mut noncausal, mut n_noncausal) = (0.0, 0usize);
    for (t, w) in truth.iter().zip(unscrambled.iter()) {
        let sq = (t - w).powi(2);
        if *t != 0.0 {
            causal += sq;
            n_causal += 1;
        } else {
            noncausal += sq;
            n_noncausal += 1;
        }
    }

    let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
    Ok((
        unscrambled,
        SolutionErrors {
            causal: mean(causal, n_causal),
            noncausal: mean(noncausal, n_noncausal),
        },
    ))
}
