//! ONNX classifier backend (pure Rust via `tract-onnx`).
//!
//! Lets a Keras model exported with `tf2onnx` be served without Python.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{Result, ServerError};
use crate::ml::classifier::Classifier;

pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    input_dim: usize,
    output_dim: usize,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_dim", &self.input_dim)
            .field("output_dim", &self.output_dim)
            .finish()
    }
}

fn unavailable(stage: &str, e: impl std::fmt::Display) -> ServerError {
    ServerError::ModelUnavailable(format!("onnx {stage} failed: {e}"))
}

impl OnnxModel {
    /// Load and specialize to a single-row `[1, input_dim]` f32 batch.
    pub fn load(path: &Path, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(ServerError::Validation("input_dim must be > 0".to_string()));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| unavailable("load", e))?
            .with_input_fact(0, f32::fact([1, input_dim]).into())
            .map_err(|e| unavailable("input fact", e))?
            .into_optimized()
            .map_err(|e| unavailable("optimize", e))?
            .into_runnable()
            .map_err(|e| unavailable("runnable", e))?;

        let mut model = Self {
            plan,
            input_dim,
            output_dim: 0,
        };
        // Probe the output width with a zero row.
        model.output_dim = model.run(&vec![0.0; input_dim])?.len();
        if model.output_dim == 0 {
            return Err(unavailable("probe", "output has zero elements"));
        }
        Ok(model)
    }

    fn run(&self, input: &[f64]) -> Result<Vec<f64>> {
        let row: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor: Tensor = tract_ndarray::Array2::<f32>::from_shape_vec((1, self.input_dim), row)
            .map_err(|e| unavailable("input reshape", e))?
            .into();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| unavailable("run", e))?;
        let first = outputs
            .first()
            .ok_or_else(|| unavailable("run", "no outputs"))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| unavailable("output decode", e))?;

        Ok(view.iter().map(|v| f64::from(*v)).collect())
    }
}

impl Classifier for OnnxModel {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn scores(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim {
            return Err(ServerError::Validation(format!(
                "onnx input dim mismatch: got {}, expected {}",
                input.len(),
                self.input_dim
            )));
        }
        self.run(input)
    }
}
