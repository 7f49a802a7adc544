//! Adam optimizer over a single dense matrix parameter.

use nalgebra::DMatrix;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Adam state (first and second moments) for one `rows × cols` parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    step: i32,
    m: DMatrix<f64>,
    v: DMatrix<f64>,
}

impl Adam {
    pub fn new(lr: f64, rows: usize, cols: usize) -> Self {
        Self {
            lr,
            step: 0,
            m: DMatrix::zeros(rows, cols),
            v: DMatrix::zeros(rows, cols),
        }
    }

    /// Apply one bias-corrected update to `param` given its gradient.
    pub fn step(&mut self, param: &mut DMatrix<f64>, grad: &DMatrix<f64>) {
        self.step = self.step.saturating_add(1);

        self.m = BETA1 * &self.m + (1.0 - BETA1) * grad;
        self.v = BETA2 * &self.v + (1.0 - BETA2) * grad.component_mul(grad);

        let c1 = 1.0 - BETA1.powi(self.step);
        let c2 = 1.0 - BETA2.powi(self.step);

        param.zip_zip_apply(&self.m, &self.v, |p, m, v| {
            let m_hat = m / c1;
            let v_hat = v / c2;
            *p -= self.lr * m_hat / (v_hat.sqrt() + EPSILON);
        });
    }
}
