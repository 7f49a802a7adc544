//! Invariant causal prediction.
//!
//! For every non-empty subset `S` of features we:
//! - regress the pooled targets on the pooled features restricted to `S`
//! - for each environment, test whether residuals inside the environment and
//!   outside of it share mean and variance (`mean_var_test`)
//! - accept `S` when `min_e p_e · n_envs > alpha`
//!
//! The estimate is the pooled refit on the intersection of all accepted
//! subsets; features outside the intersection get a zero coefficient.

use std::collections::BTreeSet;

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{feature_dim, Environment, EstimatorArgs};
use crate::error::EstimatorError;
use crate::fit::Estimator;
use crate::math::{mean_var_test, pool, solve_least_squares};

/// Largest feature count for the exhaustive subset search.
pub const MAX_ICP_FEATURES: usize = 20;

#[derive(Debug, Clone)]
pub struct InvariantCausalPrediction {
    coefficients: DVector<f64>,
    accepted_subsets: Vec<Vec<usize>>,
    accepted_features: Vec<usize>,
}

#[derive(Debug, Clone)]
struct SubsetTest {
    subset: Vec<usize>,
    p_value: f64,
}

impl InvariantCausalPrediction {
    pub fn fit(environments: &[Environment], args: &EstimatorArgs) -> Result<Self, EstimatorError> {
        let dim = feature_dim(environments)?;
        if dim > MAX_ICP_FEATURES {
            return Err(EstimatorError::invalid(
                "feature count",
                &format!("at most {MAX_ICP_FEATURES} for the subset search"),
                dim,
            ));
        }
        args.validate_icp()?;

        let (x_all, y_all, labels) = pool(environments);
        let n_envs = environments.len();
        for e in 0..n_envs {
            let inside = environments[e].n_rows();
            let outside = labels.len() - inside;
            if inside < 2 || outside < 2 {
                return Err(EstimatorError::InsufficientData(format!(
                    "environment {e} leaves {inside} rows inside and {outside} outside; both need >= 2"
                )));
            }
        }

        let subsets = powerset(dim);
        let tests: Vec<SubsetTest> = subsets
            .into_par_iter()
            .map(|subset| {
                let p_value = subset_p_value(&x_all, &y_all, &labels, n_envs, &subset)?;
                Ok(SubsetTest { subset, p_value })
            })
            .collect::<Result<_, EstimatorError>>()?;

        let mut accepted_subsets = Vec::new();
        for test in tests {
            if test.p_value > args.alpha {
                if args.verbose {
                    info!("Accepted subset: {:?} (p = {:.4})", test.subset, test.p_value);
                }
                accepted_subsets.push(test.subset);
            }
        }

        let mut coefficients = DVector::<f64>::zeros(dim);
        let accepted_features = intersect(&accepted_subsets);
        if accepted_subsets.is_empty() {
            warn!("ICP rejected every subset at alpha = {}; returning zero coefficients", args.alpha);
        } else {
            if args.verbose {
                info!("Intersection: {accepted_features:?}");
            }
            if !accepted_features.is_empty() {
                let x_s = x_all.select_columns(accepted_features.iter());
                let beta = solve_least_squares(&x_s, &y_all)?;
                for (k, &j) in accepted_features.iter().enumerate() {
                    coefficients[j] = beta[k];
                }
            }
        }

        Ok(Self {
            coefficients,
            accepted_subsets,
            accepted_features,
        })
    }

    /// Subsets whose invariance test was not rejected, in search order.
    pub fn accepted_subsets(&self) -> &[Vec<usize>] {
        &self.accepted_subsets
    }

    /// Features common to every accepted subset (sorted).
    pub fn accepted_features(&self) -> &[usize] {
        &self.accepted_features
    }
}

impl Estimator for InvariantCausalPrediction {
    fn name(&self) -> &'static str {
        "ICP"
    }

    fn solution(&self) -> &DVector<f64> {
        &self.coefficients
    }
}

fn subset_p_value(
    x_all: &DMatrix<f64>,
    y_all: &DVector<f64>,
    labels: &[usize],
    n_envs: usize,
    subset: &[usize],
) -> Result<f64, EstimatorError> {
    let x_s = x_all.select_columns(subset.iter());
    let beta = solve_least_squares(&x_s, y_all)?;
    let residuals = y_all - &x_s * beta;

    let mut min_p = f64::INFINITY;
    for e in 0..n_envs {
        let (res_in, res_out): (Vec<(usize, f64)>, Vec<(usize, f64)>) = residuals
            .iter()
            .copied()
            .enumerate()
            .partition(|(i, _)| labels[*i] == e);
        let res_in: Vec<f64> = res_in.into_iter().map(|(_, r)| r).collect();
        let res_out: Vec<f64> = res_out.into_iter().map(|(_, r)| r).collect();

        let p = mean_var_test(&res_in, &res_out)?;
        min_p = min_p.min(p);
    }

    // Environment-count factor, kept unclamped. It is not a strict Bonferroni
    // bound: the product can exceed 1 and is compared with alpha as is.
    Ok(min_p * n_envs as f64)
}

/// All non-empty subsets of `0..dim`, ordered by size then lexicographically.
fn powerset(dim: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::with_capacity((1usize << dim).saturating_sub(1));
    for size in 1..=dim {
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            out.push(combo.clone());

            // Advance to the next combination in lexicographic order.
            let Some(i) = (0..size).rev().find(|&i| combo[i] != i + dim - size) else {
                break;
            };
            combo[i] += 1;
            for j in (i + 1)..size {
                combo[j] = combo[j - 1] + 1;
            }
        }
    }
    out
}

fn intersect(subsets: &[Vec<usize>]) -> Vec<usize> {
    let Some((first, rest)) = subsets.split_first() else {
        return Vec::new();
    };
    let mut common: BTreeSet<usize> = first.iter().copied().collect();
    for s in rest {
        let other: BTreeSet<usize> = s.iter().copied().collect();
        common = common.intersection(&other).copied().collect();
    }
    common.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    #[test]
    fn powerset_orders_by_size_then_lexicographically() {
        let subsets = powerset(3);
        assert_eq!(
            subsets,
            vec![
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0, 1, 2]
            ]
        );
        assert_eq!(powerset(5).len(), 31);
    }

    #[test]
    fn intersection_of_accepted_subsets() {
        assert_eq!(intersect(&[vec![0, 1, 2], vec![1, 2], vec![1, 3]]), vec![1]);
        assert!(intersect(&[vec![0], vec![1]]).is_empty());
        assert!(intersect(&[]).is_empty());
    }

    /// Causal chain with a confounded effect:
    ///
    /// ```text
    /// x0 ~ N(0, s²),  x1 ~ N(0, 1)            (x1 is pure noise)
    /// y  = 1.5 x0 + N(0, 1)
    /// x2 = y + N(0, s²)                      (effect of y, shifts with s)
    /// ```
    ///
    /// Regressing on `{x0}` gives invariant residuals; any subset with `x2`
    /// absorbs environment-dependent noise.
    fn chain_environments(seed: u64) -> Vec<Environment> {
        chain_environments_with(seed, false)
    }

    /// Same chain; with `duplicate_cause`, `x1` is an exact copy of `x0`.
    fn chain_environments_with(seed: u64, duplicate_cause: bool) -> Vec<Environment> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        [0.5_f64, 2.0, 4.0]
            .iter()
            .map(|&s| {
                let n = 500;
                let mut x = DMatrix::<f64>::zeros(n, 3);
                let mut y = DVector::<f64>::zeros(n);
                for i in 0..n {
                    let x0 = s * normal.sample(&mut rng);
                    let x1 = normal.sample(&mut rng);
                    let yi = 1.5 * x0 + normal.sample(&mut rng);
                    let x2 = yi + s * normal.sample(&mut rng);
                    x[(i, 0)] = x0;
                    x[(i, 1)] = if duplicate_cause { x0 } else { x1 };
                    x[(i, 2)] = x2;
                    y[i] = yi;
                }
                Environment::new(x, y).unwrap()
            })
            .collect()
    }

    #[test]
    fn accepts_causal_subset_and_rejects_confounded_ones() {
        let envs = chain_environments(11);
        let args = EstimatorArgs {
            alpha: 1e-4,
            ..EstimatorArgs::default()
        };
        let icp = InvariantCausalPrediction::fit(&envs, &args).unwrap();

        assert!(icp.accepted_subsets().contains(&vec![0]));
        assert!(icp.accepted_subsets().iter().all(|s| !s.contains(&2)));
        assert_eq!(icp.accepted_features(), &[0]);

        let w = icp.solution();
        assert!((w[0] - 1.5).abs() < 0.1, "w = {w}");
        assert_eq!(w[1], 0.0);
        assert_eq!(w[2], 0.0);
    }

    #[test]
    fn disjoint_accepted_subsets_give_zero_coefficients() {
        // {x0} and {x1} explain y equally well, so both pass and share no feature.
        let envs = chain_environments_with(11, true);
        let args = EstimatorArgs {
            alpha: 1e-4,
            ..EstimatorArgs::default()
        };
        let icp = InvariantCausalPrediction::fit(&envs, &args).unwrap();

        assert!(icp.accepted_subsets().contains(&vec![0]));
        assert!(icp.accepted_subsets().contains(&vec![1]));
        assert!(icp.accepted_features().is_empty());
        assert!(icp.solution().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn alpha_above_one_is_a_stricter_threshold() {
        let envs = chain_environments(11);
        let loose = EstimatorArgs {
            alpha: 1e-4,
            ..EstimatorArgs::default()
        };
        let strict = EstimatorArgs {
            alpha: 1.5,
            ..EstimatorArgs::default()
        };
        let loose = InvariantCausalPrediction::fit(&envs, &loose).unwrap();
        let strict = InvariantCausalPrediction::fit(&envs, &strict).unwrap();

        for subset in strict.accepted_subsets() {
            assert!(loose.accepted_subsets().contains(subset), "{subset:?}");
        }
        assert_eq!(strict.solution().len(), 3);
    }

    #[test]
    fn negative_alpha_is_rejected() {
        let envs = chain_environments(11);
        let args = EstimatorArgs {
            alpha: -0.1,
            ..EstimatorArgs::default()
        };
        let err = InvariantCausalPrediction::fit(&envs, &args).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParameter(..)));
    }

    #[test]
    fn no_accepted_subset_gives_zero_coefficients() {
        // Targets depend on the environment through an unobserved offset, so no
        // subset has invariant residual means.
        let mut rng = StdRng::seed_from_u64(5);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let envs: Vec<Environment> = [-5.0_f64, 0.0, 5.0]
            .iter()
            .map(|&offset| {
                let x = DMatrix::from_fn(200, 2, |_, _| normal.sample(&mut rng));
                let y = DVector::from_fn(200, |i, _| x[(i, 0)] + offset + 0.1 * normal.sample(&mut rng));
                Environment::new(x, y).unwrap()
            })
            .collect();

        let icp = InvariantCausalPrediction::fit(&envs, &EstimatorArgs::default()).unwrap();
        assert!(icp.accepted_subsets().is_empty());
        assert!(icp.solution().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn too_many_features_is_rejected() {
        let x = DMatrix::<f64>::zeros(4, MAX_ICP_FEATURES + 1);
        let env = Environment::new(x, DVector::zeros(4)).unwrap();
        let err = InvariantCausalPrediction::fit(&[env.clone(), env], &EstimatorArgs::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
