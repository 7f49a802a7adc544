//! Export experiment results to JSON.
//!
//! The file carries the settings that produced the scores so a run can be
//! compared against later ones without the original command line.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{EstimatorArgs, ExperimentConfig, MethodScore, SemConfig};
use crate::error::EstimatorError;

/// Schema of an exported experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentExport {
    pub tool: String,
    pub sem: SemConfig,
    pub n_samples: usize,
    pub env_list: Vec<f64>,
    pub n_reps: usize,
    pub seed: u64,
    pub args: EstimatorArgs,
    pub scores: Vec<MethodScore>,
}

impl ExperimentExport {
    pub fn new(config: &ExperimentConfig, scores: &[MethodScore]) -> Self {
        Self {
            tool: "irm".to_string(),
            sem: config.sem.clone(),
            n_samples: config.n_samples,
            env_list: config.env_list.clone(),
            n_reps: config.n_reps,
            seed: config.seed,
            args: config.args.clone(),
            scores: scores.to_vec(),
        }
    }
}

/// Write experiment scores as pretty JSON.
pub fn write_scores_json(
    path: &Path,
    config: &ExperimentConfig,
    scores: &[MethodScore],
) -> Result<(), EstimatorError> {
    let file = File::create(path).map_err(|source| EstimatorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::to_writer_pretty(file, &ExperimentExport::new(config, scores)).map_err(|source| {
        EstimatorError::Config {
            path: path.display().to_string(),
            source,
        }
    })
}

/// Read a file produced by [`write_scores_json`].
pub fn read_scores_json(path: &Path) -> Result<ExperimentExport, EstimatorError> {
    let file = File::open(path).map_err(|source| EstimatorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| EstimatorError::Config {
        path: path.display().to_string(),
        source,
    })
}
