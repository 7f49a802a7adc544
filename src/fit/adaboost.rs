//! AdaBoost-style ensemble of per-environment regressions.
//!
//! Round 0 uses the environment-averaged least-squares fit. Each later round
//! fits least squares on one environment drawn with probability proportional to
//! the current environment weights. After every round:
//!
//! ```text
//! err_e   = MSE_e / max_e MSE_e
//! beta    = (1 - mean(err)) / mean(err)
//! alpha_i = ln(beta) / 2
//! w_e    ← w_e · beta^(1 - err_e),  then w ← w / max(w)
//! ```
//!
//! The estimate is the `alpha`-weighted average of all round coefficients.

use log::debug;
use nalgebra::DVector;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{feature_dim, Environment, EstimatorArgs};
use crate::error::EstimatorError;
use crate::fit::erm::environment_average;
use crate::fit::Estimator;
use crate::math::{fit_environment, mean_squared_error};

#[derive(Debug, Clone)]
pub struct AdaBoostErm {
    w: DVector<f64>,
    classifiers: Vec<DVector<f64>>,
    classifier_weights: Vec<f64>,
}

impl AdaBoostErm {
    pub fn fit(environments: &[Environment], args: &EstimatorArgs) -> Result<Self, EstimatorError> {
        let dim = feature_dim(environments)?;
        args.validate_adaboost()?;

        let n_envs = environments.len();
        let mut rng = StdRng::seed_from_u64(args.seed);
        let mut env_weights = vec![1.0 / n_envs as f64; n_envs];
        let mut classifiers = Vec::with_capacity(args.n_classifiers);
        let mut classifier_weights = Vec::with_capacity(args.n_classifiers);

        for round in 0..args.n_classifiers {
            let coef = if round == 0 {
                environment_average(environments)?
            } else {
                let sampler = WeightedIndex::new(&env_weights)
                    .map_err(|e| EstimatorError::DegenerateWeights(format!("environment sampling: {e}")))?;
                let e = sampler.sample(&mut rng);
                debug!("round {round}: fitting on environment {e}");
                fit_environment(&environments[e])?
            };

            let errors = normalized_errors(environments, &coef)?;
            let avg_error = errors.iter().sum::<f64>() / n_envs as f64;
            let beta = (1.0 - avg_error) / avg_error;
            let weight = beta.ln() / 2.0;
            if !weight.is_finite() {
                return Err(EstimatorError::DegenerateWeights(format!(
                    "round {round}: mean normalized error {avg_error} gives classifier weight {weight}"
                )));
            }

            for (w_e, err_e) in env_weights.iter_mut().zip(errors.iter()) {
                *w_e *= beta.powf(1.0 - err_e);
            }
            let max_weight = env_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !(max_weight.is_finite() && max_weight > 0.0) {
                return Err(EstimatorError::DegenerateWeights(format!(
                    "round {round}: environment weights collapsed (max {max_weight})"
                )));
            }
            for w_e in env_weights.iter_mut() {
                *w_e /= max_weight;
            }
            debug!("round {round}: classifier weight {weight:.4}, environment weights {env_weights:?}");

            classifiers.push(coef);
            classifier_weights.push(weight);
        }

        let total: f64 = classifier_weights.iter().sum();
        if !(total.is_finite() && total != 0.0) {
            return Err(EstimatorError::DegenerateWeights(format!(
                "classifier weights sum to {total}"
            )));
        }

        let mut w = DVector::<f64>::zeros(dim);
        for (coef, &weight) in classifiers.iter().zip(classifier_weights.iter()) {
            w += coef * weight;
        }
        w /= total;

        Ok(Self {
            w,
            classifiers,
            classifier_weights,
        })
    }

    /// Per-round coefficients, in round order.
    pub fn classifiers(&self) -> &[DVector<f64>] {
        &self.classifiers
    }

    /// Per-round weights `ln(beta) / 2`, in round order.
    pub fn classifier_weights(&self) -> &[f64] {
        &self.classifier_weights
    }
}

impl Estimator for AdaBoostErm {
    fn name(&self) -> &'static str {
        "AdaBoostERM"
    }

    fn solution(&self) -> &DVector<f64> {
        &self.w
    }
}

/// Per-environment MSE of `coef`, scaled so the worst environment scores 1.
fn normalized_errors(environments: &[Environment], coef: &DVector<f64>) -> Result<Vec<f64>, EstimatorError> {
    let mut errors: Vec<f64> = environments
        .iter()
        .map(|env| mean_squared_error(&env.x, coef, &env.y))
        .collect();

    let max_error = errors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max_error.is_finite() && max_error > 0.0) {
        return Err(EstimatorError::DegenerateWeights(format!(
            "maximum environment error is {max_error}"
        )));
    }
    for err in errors.iter_mut() {
        *err /= max_error;
    }
    Ok(errors)
}
