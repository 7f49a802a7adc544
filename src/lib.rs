//! `invariant-estimators` library crate.
//!
//! Linear estimators that learn from data split into environments:
//!
//! - empirical risk minimization, pooled and per-environment averaged (`fit::erm`)
//! - invariant causal prediction (`fit::icp`)
//! - invariant risk minimization (`fit::irm`)
//! - boosting over environments (`fit::adaboost`)
//!
//! The binary (`irm`) is a thin wrapper around [`app`], which samples
//! environments from a synthetic chain SEM and scores each estimator against
//! its known solution.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
