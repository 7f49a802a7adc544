//! Command-line parsing for the `irm` experiment runner.
//!
//! This module only defines arguments. Turning them into an
//! [`ExperimentConfig`](crate::domain::ExperimentConfig) happens in `app`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::Method;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "irm", version, about = "Invariant estimators on synthetic environments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample environments from a chain SEM, fit the chosen methods and score them.
    Run(RunArgs),
}

/// Options for `irm run`.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Feature count (causes + effects). Must be even.
    #[arg(long, default_value_t = 10)]
    pub dim: usize,

    /// Rows sampled per environment.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub n_samples: usize,

    /// Comma-separated environment noise scales. The last one is IRM's validation split.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = [0.2, 2.0, 5.0])]
    pub env_list: Vec<f64>,

    /// Comma-separated methods to fit.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Method::Erm, Method::Icp, Method::Irm])]
    pub methods: Vec<Method>,

    /// Base random seed. Repetition `r` uses `seed + r`.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of independent repetitions.
    #[arg(long, default_value_t = 1)]
    pub n_reps: usize,

    /// Identity cause and effect weights (`--ones false` draws them at random).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub ones: bool,

    /// Rotate the observed features by a random orthogonal matrix.
    #[arg(long)]
    pub scramble: bool,

    /// Environment noise enters the target (`--hetero false` moves it to the effects).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub hetero: bool,

    /// Add a hidden confounder.
    #[arg(long)]
    pub hidden: bool,

    /// JSON file with estimator args. Flags below override its values.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Adam learning rate for IRM.
    #[arg(long)]
    pub lr: Option<f64>,

    /// Gradient steps per IRM candidate.
    #[arg(long)]
    pub n_iterations: Option<usize>,

    /// Comma-separated IRM regularization weights.
    #[arg(long, value_delimiter = ',')]
    pub reg_grid: Option<Vec<f64>>,

    /// ICP significance level.
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Number of AdaBoostERM rounds.
    #[arg(long)]
    pub n_classifiers: Option<usize>,

    /// Log estimator progress.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print each estimated solution next to its errors.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub print_vectors: bool,

    /// Export per-method scores to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}
