//! Mathematical utilities: least squares, hypothesis tests and the Adam
//! optimizer.

pub mod hypothesis;
pub mod ols;
pub mod optim;

pub use hypothesis::*;
pub use ols::*;
pub use optim::*;
