//! Least squares without intercept.
//!
//! Every estimator in this crate reduces to solving small problems of the form:
//!
//! ```text
//! minimize Σ_i (y_i - x_i^T β)^2
//! ```
//!
//! over one environment, over the pooled environments, or over a column subset
//! of the pooled design (ICP).
//!
//! Implementation choices:
//! - We use SVD so tall, square and rank-deficient designs are all handled.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Singular values below `max(σ) · max(n, d) · ε` are treated as zero, which
//!   yields the minimum-norm solution for rank-deficient designs.

use nalgebra::{DMatrix, DVector};

use crate::domain::Environment;
use crate::error::EstimatorError;

/// Solve a least squares problem using SVD.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, EstimatorError> {
    if x.nrows() != y.len() {
        return Err(EstimatorError::DimensionMismatch {
            context: "least squares targets vs design rows".to_string(),
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EstimatorError::EmptyInput("least squares design is empty".to_string()));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(EstimatorError::SingularSystem("non-finite input".to_string()));
    }

    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return Err(EstimatorError::SingularSystem("design has rank zero".to_string()));
    }

    let tol = sigma_max * x.nrows().max(x.ncols()) as f64 * f64::EPSILON;
    let beta = svd
        .solve(y, tol)
        .map_err(|e| EstimatorError::SingularSystem(e.to_string()))?;

    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(EstimatorError::SingularSystem("non-finite coefficients".to_string()))
    }
}

/// Least squares on a single environment.
pub fn fit_environment(env: &Environment) -> Result<DVector<f64>, EstimatorError> {
    solve_least_squares(&env.x, &env.y)
}

/// Stack all environments into one design matrix and target vector.
///
/// Rows keep environment order; the returned labels give each row's environment index.
pub fn pool(environments: &[Environment]) -> (DMatrix<f64>, DVector<f64>, Vec<usize>) {
    let n: usize = environments.iter().map(|e| e.n_rows()).sum();
    let d = environments.first().map(|e| e.n_features()).unwrap_or(0);

    let mut x = DMatrix::<f64>::zeros(n, d);
    let mut y = DVector::<f64>::zeros(n);
    let mut labels = Vec::with_capacity(n);

    let mut offset = 0;
    for (e, env) in environments.iter().enumerate() {
        let rows = env.n_rows();
        x.rows_mut(offset, rows).copy_from(&env.x);
        y.rows_mut(offset, rows).copy_from(&env.y);
        labels.extend(std::iter::repeat(e).take(rows));
        offset += rows;
    }

    (x, y, labels)
}

/// Mean squared error of the linear predictor `w` on `(x, y)`.
pub fn mean_squared_error(x: &DMatrix<f64>, w: &DVector<f64>, y: &DVector<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let r = x * w - y;
    r.norm_squared() / y.len() as f64
}
