//! Invariant risk minimization (linear, IRMv1 penalty).
//!
//! We learn a representation `phi` (`d × d`) with a fixed readout `w = 1` by
//! minimizing
//!
//! ```text
//! reg · Σ_e R_e(phi w) + (1 - reg) · Σ_e mean((∂R_e/∂w)^2)
//! ```
//!
//! where `R_e` is the mean squared error on environment `e`. The last
//! environment is held out and used to choose `reg` from a small grid.
//!
//! Implementation choices:
//! - Each environment is reduced once to `XᵀX`, `Xᵀy`, `yᵀy`, so a gradient step
//!   costs `O(d³)` per environment regardless of the row count.
//! - Gradients with respect to `phi` are analytic; the optimizer is Adam.
//! - Grid candidates are independent and trained in parallel; selection walks
//!   them in grid order so the result is deterministic.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{feature_dim, Environment, EstimatorArgs};
use crate::error::EstimatorError;
use crate::fit::Estimator;
use crate::math::{mean_squared_error, Adam};
use crate::report::pretty;

/// Validation errors at or above this value never win the grid search.
const MAX_VALIDATION_ERROR: f64 = 1e6;

/// Held-out score of one regularization weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegCandidate {
    pub reg: f64,
    pub validation_error: f64,
}

#[derive(Debug, Clone)]
pub struct InvariantRiskMinimization {
    phi: DMatrix<f64>,
    w: DVector<f64>,
    solution: DVector<f64>,
    best_reg: f64,
    candidates: Vec<RegCandidate>,
}

/// Sufficient statistics of one training environment.
#[derive(Debug, Clone)]
struct EnvGram {
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    yty: f64,
    n: f64,
}

impl EnvGram {
    fn new(env: &Environment) -> Self {
        let xt = env.x.transpose();
        Self {
            xtx: &xt * &env.x,
            xty: &xt * &env.y,
            yty: env.y.norm_squared(),
            n: env.n_rows() as f64,
        }
    }
}

/// Objective value split into its two terms, plus the gradient w.r.t. `phi`.
struct Objective {
    error: f64,
    penalty: f64,
    grad: DMatrix<f64>,
}

impl InvariantRiskMinimization {
    pub fn fit(environments: &[Environment], args: &EstimatorArgs) -> Result<Self, EstimatorError> {
        if environments.len() < 2 {
            return Err(EstimatorError::NotEnoughEnvironments {
                method: "IRM",
                required: 2,
                found: environments.len(),
            });
        }
        let dim = feature_dim(environments)?;
        args.validate_irm()?;

        let (train, validation) = environments.split_at(environments.len() - 1);
        let validation = &validation[0];
        let grams: Vec<EnvGram> = train.iter().map(EnvGram::new).collect();
        let w = DVector::from_element(dim, 1.0);

        let trained: Vec<(RegCandidate, DMatrix<f64>)> = args
            .reg_grid
            .par_iter()
            .map(|&reg| {
                let phi = train_phi(&grams, &w, reg, args);
                let solution = &phi * &w;
                let validation_error = mean_squared_error(&validation.x, &solution, &validation.y);
                (RegCandidate { reg, validation_error }, phi)
            })
            .collect();

        let mut best: Option<(f64, usize)> = None;
        let mut best_err = MAX_VALIDATION_ERROR;
        for (idx, (candidate, _)) in trained.iter().enumerate() {
            if args.verbose {
                info!(
                    "IRM (reg={:.3}) has {:.3} validation error.",
                    candidate.reg, candidate.validation_error
                );
            }
            if !candidate.validation_error.is_finite() {
                warn!("IRM (reg={}) diverged; skipping it", candidate.reg);
                continue;
            }
            if candidate.validation_error < best_err {
                best_err = candidate.validation_error;
                best = Some((candidate.reg, idx));
            }
        }

        let Some((best_reg, best_idx)) = best else {
            return Err(EstimatorError::NoValidCandidate(format!(
                "every IRM candidate has validation error >= {MAX_VALIDATION_ERROR} or NaN"
            )));
        };

        let candidates: Vec<RegCandidate> = trained.iter().map(|(c, _)| *c).collect();
        let phi = trained
            .into_iter()
            .nth(best_idx)
            .map(|(_, phi)| phi)
            .ok_or_else(|| EstimatorError::NoValidCandidate("selected candidate vanished".to_string()))?;
        let solution = &phi * &w;

        Ok(Self {
            phi,
            w,
            solution,
            best_reg,
            candidates,
        })
    }

    /// Learned representation.
    pub fn phi(&self) -> &DMatrix<f64> {
        &self.phi
    }

    /// Fixed readout (all ones).
    pub fn w(&self) -> &DVector<f64> {
        &self.w
    }

    /// Regularization weight that won the validation search.
    pub fn best_reg(&self) -> f64 {
        self.best_reg
    }

    /// Validation error of every grid entry, in grid order.
    pub fn candidates(&self) -> &[RegCandidate] {
        &self.candidates
    }
}

impl Estimator for InvariantRiskMinimization {
    fn name(&self) -> &'static str {
        "IRM"
    }

    fn solution(&self) -> &DVector<f64> {
        &self.solution
    }
}

fn train_phi(grams: &[EnvGram], w: &DVector<f64>, reg: f64, args: &EstimatorArgs) -> DMatrix<f64> {
    let dim = w.len();
    let mut phi = DMatrix::<f64>::identity(dim, dim);
    let mut adam = Adam::new(args.lr, dim, dim);

    for iteration in 0..args.n_iterations {
        let objective = objective(grams, &phi, w, reg);
        adam.step(&mut phi, &objective.grad);

        if args.verbose && args.log_every > 0 && iteration % args.log_every == 0 {
            info!(
                "{:05} | {:.5} | {:.5} | {:.5} | {}",
                iteration,
                reg,
                objective.error,
                objective.penalty,
                pretty(&(&phi * w))
            );
        }
    }

    phi
}

/// IRM objective and its gradient with respect to `phi`.
///
/// With `v = phi w`, `c_e = XᵀX v - Xᵀy` and `g_e = (2/n) phiᵀ c_e = ∂R_e/∂w`:
///
/// ```text
/// ∂R_e/∂phi = (2/n) c_e wᵀ
/// ∂P_e/∂phi = (4 / (n d)) (c_e g_eᵀ + XᵀX phi g_e wᵀ)
/// ```
fn objective(grams: &[EnvGram], phi: &DMatrix<f64>, w: &DVector<f64>, reg: f64) -> Objective {
    let dim = w.len() as f64;
    let v = phi * w;
    let mut grad = DMatrix::<f64>::zeros(phi.nrows(), phi.ncols());
    let mut error = 0.0;
    let mut penalty = 0.0;

    for gram in grams {
        let av = &gram.xtx * &v;
        let c = &av - &gram.xty;
        let error_e = (v.dot(&av) - 2.0 * v.dot(&gram.xty) + gram.yty) / gram.n;

        let g = phi.tr_mul(&c) * (2.0 / gram.n);
        let penalty_e = g.norm_squared() / dim;

        let d_error = &c * w.transpose() * (2.0 / gram.n);
        let d_penalty = (&c * g.transpose() + &gram.xtx * (phi * &g) * w.transpose()) * (4.0 / (gram.n * dim));

        grad += d_error * reg + d_penalty * (1.0 - reg);
        error += error_e;
        penalty += penalty_e;
    }

    Objective { error, penalty, grad }
}
