//! Estimators over lists of environments.
//!
//! Responsibilities:
//!
//! - the common `Estimator` interface (construct by fitting, read the solution)
//! - pooled and per-environment least squares baselines (`erm`)
//! - invariant causal prediction (`icp`)
//! - invariant risk minimization (`irm`)
//! - boosting over environments (`adaboost`)

pub mod adaboost;
pub mod erm;
pub mod icp;
pub mod irm;

pub use adaboost::*;
pub use erm::*;
pub use icp::*;
pub use irm::*;

use nalgebra::{DMatrix, DVector};

use crate::domain::{Environment, EstimatorArgs, Method};
use crate::error::EstimatorError;

/// A fitted linear predictor. Estimators are immutable once constructed.
pub trait Estimator: std::fmt::Debug + Send + Sync {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Learned coefficient vector (one entry per feature).
    fn solution(&self) -> &DVector<f64>;

    /// Predictions for the rows of `x`.
    fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        x * self.solution()
    }
}

/// Fit the estimator selected by `method`.
pub fn fit_method(
    method: Method,
    environments: &[Environment],
    args: &EstimatorArgs,
) -> Result<Box<dyn Estimator>, EstimatorError> {
    let estimator: Box<dyn Estimator> = match method {
        Method::Erm => Box::new(EmpiricalRiskMinimizer::fit(environments, args)?),
        Method::Icp => Box::new(InvariantCausalPrediction::fit(environments, args)?),
        Method::Irm => Box::new(InvariantRiskMinimization::fit(environments, args)?),
        Method::EnsembleErm => Box::new(EnsembleErm::fit(environments, args)?),
        Method::AdaboostErm => Box::new(AdaBoostErm::fit(environments, args)?),
    };
    Ok(estimator)
}
