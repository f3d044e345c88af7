// Small dense numerics shared by the model adapters
use crate::domain::forecast::ModelFailure;
use crate::infrastructure::config::KernelArtifact;

const JITTER: f64 = 1e-9;

/// Zero-mean, unit-variance scaling; constant inputs keep a unit scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    mean: f64,
    scale: f64,
}

impl Standardizer {
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Self {
            mean,
            scale: if std > 1e-12 { std } else { 1.0 },
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn invert(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }
}

/// Squared-exponential kernel
pub fn rbf(a: &[f64], b: &[f64], length_scale: f64, signal_variance: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    signal_variance * (-sq / (2.0 * length_scale * length_scale)).exp()
}

/// Lower-triangular factor of a symmetric positive definite matrix
pub fn cholesky(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelFailure> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = matrix[i][i] - sum;
                if d <= 0.0 || !d.is_finite() {
                    return Err(ModelFailure::Numerical(format!(
                        "kernel matrix is not positive definite at row {i}"
                    )));
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (matrix[i][j] - sum) / l[j][j];
            }
        }
    }
    Ok(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor `L`
pub fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[i][k] * y[k]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }
    x
}

/// Ordinary least squares line through `(i, values[i])`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearTrend {
    pub fn fit(values: &[f64]) -> Result<Self, ModelFailure> {
        if values.len() < 2 {
            return Err(ModelFailure::InsufficientData {
                required: 2,
                actual: values.len(),
            });
        }

        let n = values.len() as f64;
        let sum_t: f64 = (0..values.len()).map(|i| i as f64).sum();
        let sum_y: f64 = values.iter().sum();
        let sum_t2: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();
        let sum_ty: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();

        let denominator = n * sum_t2 - sum_t * sum_t;
        if denominator.abs() < f64::EPSILON {
            return Err(ModelFailure::Numerical("degenerate time axis".to_string()));
        }
        let slope = (n * sum_ty - sum_t * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_t) / n;
        Ok(Self { intercept, slope })
    }

    pub fn at(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }
}

/// Exact GP regression with an RBF + white-noise kernel; predictive mean only
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    inputs: Vec<Vec<f64>>,
    weights: Vec<f64>,
    length_scale: f64,
    signal_variance: f64,
    noise_variance: f64,
}

impl GaussianProcess {
    pub fn fit(inputs: Vec<Vec<f64>>, targets: &[f64], kernel: &KernelArtifact) -> Result<Self, ModelFailure> {
        if kernel.length_scale <= 0.0 || kernel.signal_variance <= 0.0 || kernel.noise < 0.0 {
            return Err(ModelFailure::Numerical("invalid kernel hyperparameters".to_string()));
        }

        let mut gp = Self {
            inputs,
            weights: Vec::new(),
            length_scale: kernel.length_scale,
            signal_variance: kernel.signal_variance,
            noise_variance: kernel.noise,
        };
        gp.weights = gp.solve_system(targets)?;
        Ok(gp)
    }

    /// RBF (squared exponential) kernel.
    fn kernel(&self, x1: &[f64], x2: &[f64]) -> f64 {
        rbf(x1, x2, self.length_scale, self.signal_variance)
    }

    /// Solve `(K + σ²I) α = y` by Cholesky.
    fn solve_system(&self, y: &[f64]) -> Result<Vec<f64>, ModelFailure> {
        let n = self.inputs.len();
        let mut k_matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..=i {
                let k = self.kernel(&self.inputs[i], &self.inputs[j]);
                k_matrix[i][j] = k;
                k_matrix[j][i] = k;
            }
            k_matrix[i][i] += self.noise_variance + JITTER;
        }

        let l = cholesky(&k_matrix)?;
        Ok(cholesky_solve(&l, y))
    }

    /// Predictive mean at a point.
    pub fn predict(&self, x: &[f64]) -> f64 {
        self.inputs
            .iter()
            .zip(&self.weights)
            .map(|(xi, alpha)| alpha * self.kernel(xi, x))
            .sum()
    }
}
