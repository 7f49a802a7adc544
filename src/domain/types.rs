//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory while fitting
//! - deserialized from JSON config files
//! - exported alongside experiment results

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;

/// One data-generating regime: a feature matrix and its targets.
///
/// `x` is `n × d`, `y` has length `n`.
#[derive(Debug, Clone)]
pub struct Environment {
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
}

impl Environment {
    /// Pair a feature matrix with its targets, checking that the row counts agree.
    pub fn new(x: DMatrix<f64>, y: DVector<f64>) -> Result<Self, EstimatorError> {
        if x.nrows() != y.len() {
            return Err(EstimatorError::DimensionMismatch {
                context: "environment targets vs feature rows".to_string(),
                expected: x.nrows(),
                found: y.len(),
            });
        }
        Ok(Self { x, y })
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Validate a list of environments and return the shared feature dimension.
pub fn feature_dim(environments: &[Environment]) -> Result<usize, EstimatorError> {
    let Some(first) = environments.first() else {
        return Err(EstimatorError::EmptyInput("no environments supplied".to_string()));
    };
    let dim = first.n_features();
    if dim == 0 {
        return Err(EstimatorError::EmptyInput("environments have no features".to_string()));
    }

    for (e, env) in environments.iter().enumerate() {
        if env.n_rows() == 0 {
            return Err(EstimatorError::EmptyInput(format!("environment {e} has no rows")));
        }
        if env.n_features() != dim {
            return Err(EstimatorError::DimensionMismatch {
                context: format!("feature count of environment {e}"),
                expected: dim,
                found: env.n_features(),
            });
        }
        if env.y.len() != env.n_rows() {
            return Err(EstimatorError::DimensionMismatch {
                context: format!("targets of environment {e}"),
                expected: env.n_rows(),
                found: env.y.len(),
            });
        }
    }
    Ok(dim)
}

/// Default IRM regularization weights tried during validation.
pub const DEFAULT_REG_GRID: [f64; 6] = [0.0, 1e-5, 1e-4, 1e-3, 1e-2, 1e-1];

/// Estimator arguments.
///
/// Each estimator reads the subset of keys it needs:
///
/// - IRM: `lr`, `n_iterations`, `verbose`, `reg_grid`, `log_every`
/// - ICP: `alpha`, `verbose`
/// - AdaBoostERM: `n_classifiers`, `seed`
///
/// Every key is optional when deserializing from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorArgs {
    /// Adam learning rate for IRM.
    pub lr: f64,
    /// Gradient steps per IRM candidate.
    pub n_iterations: usize,
    /// Log per-candidate and per-subset progress at `info` level.
    pub verbose: bool,
    /// ICP significance level.
    pub alpha: f64,
    /// Seed for AdaBoostERM environment sampling.
    pub seed: u64,
    /// Number of AdaBoostERM rounds.
    pub n_classifiers: usize,
    /// IRM candidate regularization weights, in selection order.
    pub reg_grid: Vec<f64>,
    /// IRM progress log period (iterations).
    pub log_every: usize,
}

impl Default for EstimatorArgs {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            n_iterations: 100_000,
            verbose: false,
            alpha: 0.05,
            seed: 0,
            n_classifiers: 10,
            reg_grid: DEFAULT_REG_GRID.to_vec(),
            log_every: 1000,
        }
    }
}

impl EstimatorArgs {
    /// Check the keys IRM reads: `lr`, `reg_grid`, `log_every`.
    pub fn validate_irm(&self) -> Result<(), EstimatorError> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(EstimatorError::invalid("lr", "a finite value > 0", self.lr));
        }
        if self.reg_grid.is_empty() {
            return Err(EstimatorError::invalid("reg_grid", "at least one value", "[]"));
        }
        if let Some(reg) = self
            .reg_grid
            .iter()
            .find(|r| !(r.is_finite() && (0.0..=1.0).contains(*r)))
        {
            return Err(EstimatorError::invalid("reg_grid", "values in [0, 1]", reg));
        }
        if self.log_every == 0 {
            return Err(EstimatorError::invalid("log_every", ">= 1", 0));
        }
        Ok(())
    }

    /// Check the key ICP reads: `alpha`.
    ///
    /// Subset p-values are scaled by the environment count and can exceed 1,
    /// so any finite non-negative threshold is meaningful.
    pub fn validate_icp(&self) -> Result<(), EstimatorError> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(EstimatorError::invalid("alpha", "a finite value >= 0", self.alpha));
        }
        Ok(())
    }

    /// Check the key AdaBoostERM reads: `n_classifiers`.
    pub fn validate_adaboost(&self) -> Result<(), EstimatorError> {
        if self.n_classifiers == 0 {
            return Err(EstimatorError::invalid("n_classifiers", ">= 1", 0));
        }
        Ok(())
    }

    /// Check only the keys read by `methods`.
    pub fn validate_for(&self, methods: &[Method]) -> Result<(), EstimatorError> {
        for method in methods {
            match method {
                Method::Irm => self.validate_irm()?,
                Method::Icp => self.validate_icp()?,
                Method::AdaboostErm => self.validate_adaboost()?,
                Method::Erm | Method::EnsembleErm => {}
            }
        }
        Ok(())
    }
}

/// Estimators available to experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Erm,
    Icp,
    Irm,
    EnsembleErm,
    AdaboostErm,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Erm,
        Method::Icp,
        Method::Irm,
        Method::EnsembleErm,
        Method::AdaboostErm,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Method::Erm => "ERM",
            Method::Icp => "ICP",
            Method::Irm => "IRM",
            Method::EnsembleErm => "EnsembleERM",
            Method::AdaboostErm => "AdaBoostERM",
        }
    }
}

/// Shape of the synthetic chain structural equation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemConfig {
    /// Total feature count (causes + effects). Must be even.
    pub dim: usize,
    /// Identity cause→target and target→effect weights.
    pub ones: bool,
    /// Rotate the observed features by a random orthogonal matrix.
    pub scramble: bool,
    /// Environment noise enters the target (true) or the effects (false).
    pub hetero: bool,
    /// Add a hidden confounder acting on causes, target and effects.
    pub hidden: bool,
}

impl Default for SemConfig {
    fn default() -> Self {
        Self {
            dim: 10,
            ones: true,
            scramble: false,
            hetero: true,
            hidden: false,
        }
    }
}

/// A full experiment run as understood by the pipeline.
///
/// This is derived from CLI flags (plus an optional JSON args file).
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub sem: SemConfig,
    /// Rows sampled per environment.
    pub n_samples: usize,
    /// Noise scale of each environment. The last one is IRM's validation split.
    pub env_list: Vec<f64>,
    pub methods: Vec<Method>,
    pub n_reps: usize,
    pub seed: u64,
    pub print_vectors: bool,
    pub args: EstimatorArgs,
    pub export: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sem: SemConfig::default(),
            n_samples: 1000,
            env_list: vec![0.2, 2.0, 5.0],
            methods: vec![Method::Erm, Method::Icp, Method::Irm],
            n_reps: 1,
            seed: 0,
            print_vectors: true,
            args: EstimatorArgs::default(),
            export: None,
        }
    }
}

/// Scores of one fitted estimator against the known SEM solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodScore {
    pub method: Method,
    pub rep: usize,
    pub error_causal: f64,
    pub error_noncausal: f64,
    /// Estimated solution mapped back into SEM coordinates.
    pub solution: Vec<f64>,
}
