//! Dense neural network inference (CPU-only).
//!
//! Small MLPs exported to JSON: per-layer weights and bias, an activation per
//! layer, and the z-score statistics the training run standardized with.
//!
//! Shapes are validated on load so a bad artifact fails at startup rather
//! than on the first request.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
    /// Applied across the whole layer output
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn in_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    fn out_dim(&self) -> usize {
        self.weights.len()
    }

    /// Every row must read `in_width` values and every parameter must be finite.
    fn check(&self, in_width: usize) -> std::result::Result<(), String> {
        if self.weights.is_empty() {
            return Err("no output units".to_string());
        }
        if self.bias.len() != self.out_dim() {
            return Err(format!(
                "{} biases for {} units",
                self.bias.len(),
                self.out_dim()
            ));
        }
        if let Some(r) = self.weights.iter().position(|row| row.len() != in_width) {
            return Err(format!(
                "weights row {r} has {} columns, previous layer is {in_width} wide",
                self.weights[r].len()
            ));
        }
        if !self.weights.iter().all(|row| all_finite(row)) || !all_finite(&self.bias) {
            return Err("parameters must be finite".to_string());
        }
        Ok(())
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension.
    pub input_dim: usize,

    /// Optional z-score normalization.
    #[serde(default)]
    pub input_mean: Option<Vec<f64>>,
    #[serde(default)]
    pub input_std: Option<Vec<f64>>,

    pub layers: Vec<DenseLayer>,

    /// Optional free-form metadata (versioning, training info, etc).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DenseNetwork {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let model: Self = serde_json::from_str(&content)?;
        model.validate().map_err(ServerError::Validation)?;
        Ok(model)
    }

    /// Structural checks run once at load; `forward` relies on them.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        let Some((_, hidden)) = self.layers.split_last() else {
            return Err("network has no layers".to_string());
        };
        // A hidden softmax would hand the next layer a distribution, which no
        // exported classifier does; only the output layer may normalize.
        if let Some(idx) = hidden.iter().position(|l| l.activation == Activation::Softmax) {
            return Err(format!("layer[{idx}]: softmax is only allowed on the output layer"));
        }

        self.check_standardization()?;

        self.layers
            .iter()
            .enumerate()
            .try_fold(self.input_dim, |width, (idx, layer)| {
                layer
                    .check(width)
                    .map(|()| layer.out_dim())
                    .map_err(|e| format!("layer[{idx}]: {e}"))
            })
            .map(|_| ())
    }

    fn check_standardization(&self) -> std::result::Result<(), String> {
        let (mean, std) = match (&self.input_mean, &self.input_std) {
            (None, None) => return Ok(()),
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err("input_mean and input_std must be provided together".to_string()),
        };
        for (name, stats) in [("input_mean", mean), ("input_std", std)] {
            if stats.len() != self.input_dim {
                return Err(format!(
                    "{name} has {} entries for {} inputs",
                    stats.len(),
                    self.input_dim
                ));
            }
        }
        if !all_finite(mean) {
            return Err("input_mean must be finite".to_string());
        }
        if !all_finite(std) || std.iter().any(|v| *v <= 0.0) {
            return Err("input_std must be finite and > 0".to_string());
        }
        Ok(())
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim {
            return Err(ServerError::Validation(format!(
                "DenseNetwork input dim mismatch: got {}, expected {}",
                input.len(),
                self.input_dim
            )));
        }

        let mut x: Vec<f64> = input.to_vec();

        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            for i in 0..x.len() {
                let denom = std[i].max(1e-12);
                x[i] = (x[i] - mean[i]) / denom;
            }
        }

        for layer in &self.layers {
            let in_dim = layer.in_dim();

            let mut y: Vec<f64> = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, b)| {
                    debug_assert_eq!(row.len(), in_dim);
                    row.iter().zip(&x).fold(*b, |acc, (w, xi)| acc + w * xi)
                })
                .collect();

            if layer.activation == Activation::Softmax {
                softmax_in_place(&mut y);
            } else {
                for v in y.iter_mut() {
                    *v = apply_activation(*v, layer.activation);
                }
            }
            x = y;
        }

        Ok(x)
    }
}

fn apply_activation(x: f64, act: Activation) -> f64 {
    match act {
        Activation::Linear | Activation::Softmax => x,
        Activation::Relu => x.max(0.0),
        Activation::Tanh => x.tanh(),
        Activation::Sigmoid => sigmoid(x),
    }
}

fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Max-shifted softmax.
pub fn softmax_in_place(v: &mut [f64]) {
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    if sum > 0.0 {
        for x in v.iter_mut() {
            *x /= sum;
        }
    }
}
