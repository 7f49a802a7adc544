//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the estimator input (`Environment`) and its validation
//! - estimator configuration (`EstimatorArgs`)
//! - experiment configuration (`Method`, `SemConfig`, `ExperimentConfig`) and outputs (`MethodScore`)

pub mod types;

pub use types::*;
