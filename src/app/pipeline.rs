//! Shared experiment pipeline.
//!
//! seed -> chain SEM -> sample one environment per scale -> fit each method -> score
//!
//! The binary only handles presentation; tests drive this module directly.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::ChainEquationModel;
use crate::domain::{Environment, ExperimentConfig, MethodScore};
use crate::error::EstimatorError;
use crate::fit::fit_method;
use crate::report::{pretty, solution_errors};

/// Reject settings the pipeline cannot run before any sampling happens.
pub fn validate_config(config: &ExperimentConfig) -> Result<(), EstimatorError> {
    if config.n_reps == 0 {
        return Err(EstimatorError::invalid("n_reps", ">= 1", 0));
    }
    if config.n_samples < 2 {
        return Err(EstimatorError::invalid("n_samples", ">= 2", config.n_samples));
    }
    if config.methods.is_empty() {
        return Err(EstimatorError::invalid("methods", "at least one method", "none"));
    }
    if config.env_list.is_empty() {
        return Err(EstimatorError::invalid("env_list", "at least one environment", "none"));
    }
    if let Some(e) = config.env_list.iter().find(|e| !e.is_finite()) {
        return Err(EstimatorError::invalid("env_list", "finite scales", e));
    }
    config.args.validate_for(&config.methods)
}

/// Run every repetition and return one score per (rep, method), in run order.
pub fn run_experiment(config: &ExperimentConfig) -> Result<Vec<MethodScore>, EstimatorError> {
    validate_config(config)?;

    let mut scores = Vec::with_capacity(config.n_reps * config.methods.len());
    for rep in 0..config.n_reps {
        scores.extend(run_rep(config, rep)?);
    }
    Ok(scores)
}

/// One repetition: fresh SEM and environments seeded by `seed + rep`.
pub fn run_rep(config: &ExperimentConfig, rep: usize) -> Result<Vec<MethodScore>, EstimatorError> {
    let seed = config.seed.wrapping_add(rep as u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let sem = ChainEquationModel::new(&config.sem, &mut rng)?;
    let environments = sample_environments(&sem, config, &mut rng)?;
    let (truth, scramble) = sem.solution();
    debug!("rep {rep}: true solution {}", pretty(&truth));

    let mut args = config.args.clone();
    args.seed = seed;

    let mut scores = Vec::with_capacity(config.methods.len());
    for &method in &config.methods {
        info!("rep {rep}: fitting {}", method.display_name());
        let estimator = fit_method(method, &environments, &args)?;
        let (solution, errors) = solution_errors(&truth, scramble, estimator.solution())?;
        info!(
            "rep {rep}: {} causal={:.5} noncausal={:.5}",
            estimator.name(),
            errors.causal,
            errors.noncausal
        );

        scores.push(MethodScore {
            method,
            rep,
            error_causal: errors.causal,
            error_noncausal: errors.noncausal,
            solution: solution.iter().copied().collect(),
        });
    }
    Ok(scores)
}

/// Draw `n_samples` rows for every scale in `env_list`, in order.
pub fn sample_environments(
    sem: &ChainEquationModel,
    config: &ExperimentConfig,
    rng: &mut StdRng,
) -> Result<Vec<Environment>, EstimatorError> {
    config
        .env_list
        .iter()
        .map(|&env| sem.sample(config.n_samples, env, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstimatorArgs, Method, SemConfig};

    fn small_config(methods: Vec<Method>) -> ExperimentConfig {
        ExperimentConfig {
            sem: SemConfig {
                dim: 4,
                ..SemConfig::default()
            },
            n_samples: 300,
            methods,
            n_reps: 2,
            args: EstimatorArgs {
                n_iterations: 50,
                reg_grid: vec![0.0, 0.1],
                ..EstimatorArgs::default()
            },
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn one_score_per_rep_and_method() {
        let config = small_config(vec![Method::Erm, Method::EnsembleErm]);
        let scores = run_experiment(&config).unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0].method, Method::Erm);
        assert_eq!(scores[1].method, Method::EnsembleErm);
        assert_eq!(scores[2].rep, 1);
        assert!(scores.iter().all(|s| s.solution.len() == 4));
    }

    #[test]
    fn same_seed_reproduces_scores() {
        let config = small_config(vec![Method::AdaboostErm]);
        let a = run_experiment(&config).unwrap();
        let b = run_experiment(&config).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.solution, y.solution);
        }
    }

    #[test]
    fn environments_follow_env_list() {
        let config = small_config(vec![Method::Erm]);
        let mut rng = StdRng::seed_from_u64(0);
        let sem = ChainEquationModel::new(&config.sem, &mut rng).unwrap();
        let envs = sample_environments(&sem, &config, &mut rng).unwrap();
        assert_eq!(envs.len(), config.env_list.len());
        assert!(envs.iter().all(|e| e.n_rows() == 300 && e.n_features() == 4));
    }

    #[test]
    fn unused_keys_do_not_block_a_run() {
        let mut config = small_config(vec![Method::Erm, Method::Irm]);
        config.n_reps = 1;
        config.args.alpha = 2.0;
        config.args.n_classifiers = 0;
        assert_eq!(run_experiment(&config).unwrap().len(), 2);

        config.methods = vec![Method::AdaboostErm];
        assert_eq!(run_experiment(&config).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn empty_method_list_is_rejected() {
        let config = small_config(Vec::new());
        let err = run_experiment(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
