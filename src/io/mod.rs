//! Input/output helpers.
//!
//! - estimator args JSON (`config`)
//! - experiment result exports (`export`)

pub mod config;
pub mod export;

pub use config::*;
pub use export::*;
