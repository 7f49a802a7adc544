//! Two-sample tests used by invariant causal prediction.
//!
//! ICP compares the residuals inside one environment with the residuals of all
//! other environments. Equal residual distributions are checked through their
//! first two moments:
//!
//! - mean: Welch's unequal-variance t-test (two-sided)
//! - variance: F-test on the ratio of sample variances (two-sided)
//!
//! and the two p-values are combined with a Bonferroni factor of 2.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::error::EstimatorError;

/// Sample mean and unbiased (ddof = 1) variance.
fn mean_var(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (mean, ss / (n - 1.0))
}

fn require_two(values: &[f64], label: &str) -> Result<(), EstimatorError> {
    if values.len() < 2 {
        return Err(EstimatorError::InsufficientData(format!(
            "{label} sample needs at least 2 values, found {}",
            values.len()
        )));
    }
    Ok(())
}

/// Two-sided p-value of Welch's t-test for equal means.
pub fn welch_t_test(x: &[f64], y: &[f64]) -> Result<f64, EstimatorError> {
    require_two(x, "first")?;
    require_two(y, "second")?;

    let (mx, vx) = mean_var(x);
    let (my, vy) = mean_var(y);
    let sx = vx / x.len() as f64;
    let sy = vy / y.len() as f64;
    let se2 = sx + sy;

    // Both samples constant: the means either agree exactly or differ with certainty.
    if se2 <= 0.0 {
        return Ok(if mx == my { 1.0 } else { 0.0 });
    }

    let t = (mx - my) / se2.sqrt();
    let df = se2 * se2 / (sx * sx / (x.len() as f64 - 1.0) + sy * sy / (y.len() as f64 - 1.0));
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EstimatorError::invalid("Welch degrees of freedom", "a finite value > 0", format!("{df} ({e})")))?;
    Ok((2.0 * dist.cdf(-t.abs())).min(1.0))
}

/// Two-sided p-value of the F-test for equal variances.
pub fn variance_ratio_test(x: &[f64], y: &[f64]) -> Result<f64, EstimatorError> {
    require_two(x, "first")?;
    require_two(y, "second")?;

    let (_, vx) = mean_var(x);
    let (_, vy) = mean_var(y);
    if vx <= 0.0 && vy <= 0.0 {
        return Ok(1.0);
    }
    // Exactly one constant sample: the variances differ with certainty.
    if vx <= 0.0 || vy <= 0.0 {
        return Ok(0.0);
    }

    let (d1, d2) = (x.len() as f64 - 1.0, y.len() as f64 - 1.0);
    let dist = FisherSnedecor::new(d1, d2)
        .map_err(|e| EstimatorError::invalid("F-test degrees of freedom", "values > 0", format!("({d1}, {d2}) ({e})")))?;
    let lower = dist.cdf(vx / vy);
    Ok(2.0 * lower.min(1.0 - lower))
}

/// Combined p-value for "same mean and same variance".
pub fn mean_var_test(x: &[f64], y: &[f64]) -> Result<f64, EstimatorError> {
    let p_mean = welch_t_test(x, y)?;
    let p_var = variance_ratio_test(x, y)?;
    Ok(2.0 * p_mean.min(p_var))
}
