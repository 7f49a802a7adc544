//! Synthetic chain structural equation model.
//!
//! Variables come in blocks of `dim / 2`:
//!
//! ```text
//! h  (hidden confounder)
//! x = h·Whx + noise          (causes of y)
//! y = x·Wxy + h·Why + noise
//! z = y·Wyz + h·Whz + noise  (effects of y)
//! ```
//!
//! Each environment rescales the noise by its own factor. The observed
//! features are `[x, z]`, optionally rotated by a random orthogonal matrix, and
//! the target is the row sum of `y`. Only `x` has an invariant relation to the
//! target, which is what the estimators are scored against.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{Environment, SemConfig};
use crate::error::EstimatorError;

#[derive(Debug, Clone)]
pub struct ChainEquationModel {
    half: usize,
    hetero: bool,
    wxy: DMatrix<f64>,
    wyz: DMatrix<f64>,
    whx: DMatrix<f64>,
    why: DMatrix<f64>,
    whz: DMatrix<f64>,
    scramble: DMatrix<f64>,
    normal: Normal<f64>,
}

impl ChainEquationModel {
    /// Draw the structural weights for `config` from `rng`.
    pub fn new(config: &SemConfig, rng: &mut StdRng) -> Result<Self, EstimatorError> {
        if config.dim < 2 || config.dim % 2 != 0 {
            return Err(EstimatorError::invalid("dim", "an even number >= 2", config.dim));
        }
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| EstimatorError::invalid("noise distribution", "N(0, 1)", e))?;

        let dim = config.dim;
        let half = dim / 2;
        let scale = 1.0 / dim as f64;
        let gaussian = |rows: usize, cols: usize, rng: &mut StdRng| {
            DMatrix::from_fn(rows, cols, |_, _| normal.sample(rng) * scale)
        };

        let (wxy, wyz) = if config.ones {
            (DMatrix::identity(half, half), DMatrix::identity(half, half))
        } else {
            (gaussian(half, half, rng), gaussian(half, half, rng))
        };

        let scramble = if config.scramble {
            let m = DMatrix::from_fn(dim, dim, |_, _| normal.sample(rng));
            m.qr().q()
        } else {
            DMatrix::identity(dim, dim)
        };

        let (whx, why, whz) = if config.hidden {
            (
                gaussian(half, half, rng),
                gaussian(half, half, rng),
                gaussian(half, half, rng),
            )
        } else {
            (
                DMatrix::identity(half, half),
                DMatrix::zeros(half, half),
                DMatrix::zeros(half, half),
            )
        };

        Ok(Self {
            half,
            hetero: config.hetero,
            wxy,
            wyz,
            whx,
            why,
            whz,
            scramble,
            normal,
        })
    }

    /// True invariant coefficients in unscrambled coordinates, and the scramble matrix.
    ///
    /// Causes get the row sums of `Wxy`; effects get zero.
    pub fn solution(&self) -> (DVector<f64>, &DMatrix<f64>) {
        let mut w = DVector::<f64>::zeros(2 * self.half);
        for i in 0..self.half {
            w[i] = self.wxy.row(i).sum();
        }
        (w, &self.scramble)
    }

    /// Sample `n` rows from the environment with noise scale `env`.
    pub fn sample(&self, n: usize, env: f64, rng: &mut StdRng) -> Result<Environment, EstimatorError> {
        if n == 0 {
            return Err(EstimatorError::invalid("n_samples", ">= 1", n));
        }
        if !env.is_finite() {
            return Err(EstimatorError::invalid("environment scale", "a finite value", env));
        }

        let half = self.half;
        let noise = |s: f64, rng: &mut StdRng| {
            DMatrix::from_fn(n, half, |_, _| self.normal.sample(rng) * s)
        };

        let h = noise(env, rng);
        let x = &h * &self.whx + noise(env, rng);
        let (y, z) = if self.hetero {
            let y = &x * &self.wxy + &h * &self.why + noise(env, rng);
            let z = &y * &self.wyz + &h * &self.whz + noise(1.0, rng);
            (y, z)
        } else {
            let y = &x * &self.wxy + &h * &self.why + noise(1.0, rng);
            let z = &y * &self.wyz + &h * &self.whz + noise(env, rng);
            (y, z)
        };

        let mut features = DMatrix::<f64>::zeros(n, 2 * half);
        features.columns_mut(0, half).copy_from(&x);
        features.columns_mut(half, half).copy_from(&z);
        let features = features * &self.scramble;

        let target = DVector::from_fn(n, |i, _| y.row(i).sum());
        Environment::new(features, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn rejects_odd_dimension() {
        let mut rng = StdRng::seed_from_u64(0);
        let config = SemConfig {
            dim: 5,
            ..SemConfig::default()
        };
        assert!(ChainEquationModel::new(&config, &mut rng).is_err());
    }

    #[test]
    fn solution_puts_weight_on_causes_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let sem = ChainEquationModel::new(&SemConfig::default(), &mut rng).unwrap();
        let (w, scramble) = sem.solution();
        assert_eq!(w.len(), 10);
        assert!(w.rows(0, 5).iter().all(|&v| v == 1.0));
        assert!(w.rows(5, 5).iter().all(|&v| v == 0.0));
        assert_eq!(scramble, &DMatrix::<f64>::identity(10, 10));
    }

    #[test]
    fn scramble_is_orthogonal() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = SemConfig {
            dim: 6,
            scramble: true,
            ..SemConfig::default()
        };
        let sem = ChainEquationModel::new(&config, &mut rng).unwrap();
        let (_, q) = sem.solution();
        let qtq = q.transpose() * q;
        let eye = DMatrix::<f64>::identity(6, 6);
        assert!((qtq - eye).abs().max() < 1e-10);
    }

    #[test]
    fn sample_shapes_and_causal_relation() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = SemConfig {
            dim: 4,
            ..SemConfig::default()
        };
        let sem = ChainEquationModel::new(&config, &mut rng).unwrap();
        let env = sem.sample(2000, 1.0, &mut rng).unwrap();
        assert_eq!(env.n_rows(), 2000);
        assert_eq!(env.n_features(), 4);

        // Regressing the target on the causes alone recovers the row sums of Wxy (= 1).
        let causes = env.x.columns(0, 2).into_owned();
        let beta = crate::math::solve_least_squares(&causes, &env.y).unwrap();
        assert!((beta[0] - 1.0).abs() < 0.1, "beta = {beta}");
        assert!((beta[1] - 1.0).abs() < 0.1, "beta = {beta}");
    }
}
