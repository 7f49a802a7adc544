//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging and maps errors to exit codes; this
//! module parses arguments, runs the experiment pipeline, prints the report and
//! writes the optional export.

use clap::Parser;
use log::info;

use crate::cli::{Command, RunArgs};
use crate::domain::{EstimatorArgs, ExperimentConfig, SemConfig};
use crate::error::EstimatorError;

pub mod pipeline;

/// Entry point for the `irm` binary.
pub fn run() -> Result<(), EstimatorError> {
    let cli = crate::cli::Cli::parse_from(std::env::args());

    match cli.command {
        Command::Run(args) => handle_run(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), EstimatorError> {
    let config = experiment_config_from_args(&args)?;
    println!("{}", crate::report::format_run_header(&config));

    pipeline::validate_config(&config)?;
    let mut scores = Vec::with_capacity(config.n_reps * config.methods.len());
    for rep in 0..config.n_reps {
        let rep_scores = pipeline::run_rep(&config, rep)?;
        print!(
            "{}",
            crate::report::format_rep_scores(&rep_scores, &config.env_list, config.print_vectors)
        );
        scores.extend(rep_scores);
    }

    println!();
    println!("{}", crate::report::format_summary(&scores, &config.methods));

    if let Some(path) = &config.export {
        crate::io::write_scores_json(path, &config, &scores)?;
        info!("wrote {} scores to {}", scores.len(), path.display());
    }

    Ok(())
}

/// Build the experiment settings from CLI flags.
///
/// Estimator args start from `--config` (or defaults); explicit flags override.
pub fn experiment_config_from_args(args: &RunArgs) -> Result<ExperimentConfig, EstimatorError> {
    let mut estimator_args = match &args.config {
        Some(path) => crate::io::read_args_json(path)?,
        None => EstimatorArgs::default(),
    };
    if let Some(lr) = args.lr {
        estimator_args.lr = lr;
    }
    if let Some(n) = args.n_iterations {
        estimator_args.n_iterations = n;
    }
    if let Some(grid) = &args.reg_grid {
        estimator_args.reg_grid = grid.clone();
    }
    if let Some(alpha) = args.alpha {
        estimator_args.alpha = alpha;
    }
    if let Some(n) = args.n_classifiers {
        estimator_args.n_classifiers = n;
    }
    estimator_args.verbose |= args.verbose;
    estimator_args.validate_for(&args.methods)?;

    Ok(ExperimentConfig {
        sem: SemConfig {
            dim: args.dim,
            ones: args.ones,
            scramble: args.scramble,
            hetero: args.hetero,
            hidden: args.hidden,
        },
        n_samples: args.n_samples,
        env_list: args.env_list.clone(),
        methods: args.methods.clone(),
        n_reps: args.n_reps,
        seed: args.seed,
        print_vectors: args.print_vectors,
        args: estimator_args,
        export: args.export.clone(),
    })
}
