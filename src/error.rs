//! Errors
//!
//! Every fallible routine in the crate returns `EstimatorError`. The binary maps
//! each variant to a process exit code via [`EstimatorError::exit_code`].

use thiserror::Error;

/// Errors raised while validating inputs or fitting an estimator.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// No environments (or an environment without rows) were supplied.
    #[error("Empty input: {0}")]
    EmptyInput(String),
    /// Shapes of matrices/vectors do not line up.
    #[error("Dimension mismatch: expected {expected}, found {found} ({context}).")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    /// The estimator needs more environments than were supplied.
    #[error("{method} needs at least {required} environments, {found} provided.")]
    NotEnoughEnvironments {
        method: &'static str,
        required: usize,
        found: usize,
    },
    /// Too few observations for a statistical test.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// The least-squares system could not be solved.
    #[error("Least squares system is singular or not finite ({0}).")]
    SingularSystem(String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Grid search finished without an acceptable candidate.
    #[error("No valid candidate: {0}")]
    NoValidCandidate(String),
    /// Boosting weights became zero, infinite or NaN.
    #[error("Degenerate weights: {0}")]
    DegenerateWeights(String),
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A JSON config or export could not be (de)serialized.
    #[error("Invalid JSON in {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EstimatorError {
    /// Process exit code used by the `irm` binary.
    ///
    /// - `2`: bad configuration or parameters
    /// - `3`: not enough data
    /// - `4`: numerical failure while fitting
    /// - `5`: file system / serialization failure
    pub fn exit_code(&self) -> u8 {
        match self {
            EstimatorError::InvalidParameter(..) | EstimatorError::Config { .. } => 2,
            EstimatorError::EmptyInput(_)
            | EstimatorError::DimensionMismatch { .. }
            | EstimatorError::NotEnoughEnvironments { .. }
            | EstimatorError::InsufficientData(_) => 3,
            EstimatorError::SingularSystem(_)
            | EstimatorError::NoValidCandidate(_)
            | EstimatorError::DegenerateWeights(_) => 4,
            EstimatorError::Io { .. } => 5,
        }
    }

    pub(crate) fn invalid(name: &str, expected: &str, found: impl ToString) -> Self {
        EstimatorError::InvalidParameter(name.to_string(), expected.to_string(), found.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_failure_kind() {
        assert_eq!(EstimatorError::invalid("lr", "> 0", -1.0).exit_code(), 2);
        assert_eq!(EstimatorError::InsufficientData("x".into()).exit_code(), 3);
        assert_eq!(EstimatorError::SingularSystem("x".into()).exit_code(), 4);
    }

    #[test]
    fn invalid_parameter_message_names_the_parameter() {
        let err = EstimatorError::invalid("alpha", "a value in (0, 1)", 3.0);
        assert_eq!(
            err.to_string(),
            "Invalid parameter value passed for alpha, expected a value in (0, 1) but 3 provided."
        );
    }
}
