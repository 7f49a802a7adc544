//! Empirical risk minimization baselines.
//!
//! - `EmpiricalRiskMinimizer`: one least-squares fit on the pooled environments
//! - `EnsembleErm`: one least-squares fit per environment, averaged uniformly

use log::debug;
use nalgebra::DVector;

use crate::domain::{feature_dim, Environment, EstimatorArgs};
use crate::error::EstimatorError;
use crate::fit::Estimator;
use crate::math::{fit_environment, pool, solve_least_squares};

/// Pooled ordinary least squares (the non-robust baseline).
#[derive(Debug, Clone)]
pub struct EmpiricalRiskMinimizer {
    w: DVector<f64>,
}

impl EmpiricalRiskMinimizer {
    pub fn fit(environments: &[Environment], _args: &EstimatorArgs) -> Result<Self, EstimatorError> {
        feature_dim(environments)?;
        let (x, y, _) = pool(environments);
        let w = solve_least_squares(&x, &y)?;
        Ok(Self { w })
    }
}

impl Estimator for EmpiricalRiskMinimizer {
    fn name(&self) -> &'static str {
        "ERM"
    }

    fn solution(&self) -> &DVector<f64> {
        &self.w
    }
}

/// Uniform average of per-environment least-squares coefficients.
#[derive(Debug, Clone)]
pub struct EnsembleErm {
    w: DVector<f64>,
}

impl EnsembleErm {
    pub fn fit(environments: &[Environment], _args: &EstimatorArgs) -> Result<Self, EstimatorError> {
        let w = environment_average(environments)?;
        Ok(Self { w })
    }
}

impl Estimator for EnsembleErm {
    fn name(&self) -> &'static str {
        "EnsembleERM"
    }

    fn solution(&self) -> &DVector<f64> {
        &self.w
    }
}

/// Average of the per-environment least-squares coefficients.
pub(crate) fn environment_average(environments: &[Environment]) -> Result<DVector<f64>, EstimatorError> {
    let dim = feature_dim(environments)?;
    let mut w = DVector::<f64>::zeros(dim);
    for (e, env) in environments.iter().enumerate() {
        let w_e = fit_environment(env)?;
        debug!("environment {e}: least squares coefficients {}", crate::report::pretty(&w_e));
        w += w_e;
    }
    w /= environments.len() as f64;
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn linear_env(rng: &mut StdRng, n: usize, w: &[f64], noise: f64) -> Environment {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let x = DMatrix::from_fn(n, w.len(), |_, _| normal.sample(rng));
        let w = DVector::from_row_slice(w);
        let eps = DVector::from_fn(n, |_, _| noise * normal.sample(rng));
        let y = &x * w + eps;
        Environment::new(x, y).unwrap()
    }

    #[test]
    fn erm_matches_pooled_normal_equations() {
        let mut rng = StdRng::seed_from_u64(1);
        let envs = vec![
            linear_env(&mut rng, 50, &[1.0, -2.0, 0.5], 0.1),
            linear_env(&mut rng, 80, &[1.5, -1.0, 0.0], 0.3),
        ];
        let erm = EmpiricalRiskMinimizer::fit(&envs, &EstimatorArgs::default()).unwrap();

        let (x, y, _) = pool(&envs);
        let reference = (x.transpose() * &x).lu().solve(&(x.transpose() * &y)).unwrap();
        for (a, b) in erm.solution().iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn erm_recovers_noiseless_coefficients() {
        let mut rng = StdRng::seed_from_u64(2);
        let envs = vec![linear_env(&mut rng, 30, &[0.3, 4.0], 0.0)];
        let erm = EmpiricalRiskMinimizer::fit(&envs, &EstimatorArgs::default()).unwrap();
        assert!((erm.solution()[0] - 0.3).abs() < 1e-10);
        assert!((erm.solution()[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ensemble_is_uniform_average_of_environment_fits() {
        let mut rng = StdRng::seed_from_u64(3);
        let envs = vec![
            linear_env(&mut rng, 40, &[1.0, 0.0], 0.2),
            linear_env(&mut rng, 40, &[3.0, 1.0], 0.2),
            linear_env(&mut rng, 60, &[2.0, -1.0], 0.2),
        ];
        let ens = EnsembleErm::fit(&envs, &EstimatorArgs::default()).unwrap();

        let mut expected = DVector::<f64>::zeros(2);
        for env in &envs {
            expected += fit_environment(env).unwrap();
        }
        expected /= 3.0;
        for (a, b) in ens.solution().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_environment_list_is_rejected() {
        assert!(EmpiricalRiskMinimizer::fit(&[], &EstimatorArgs::default()).is_err());
        assert!(EnsembleErm::fit(&[], &EstimatorArgs::default()).is_err());
    }
}
