//! Activity-level inference service.
//!
//! Owns the loaded model and turns a `FeatureVector` into a class index plus
//! a probability distribution over the five activity levels.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::domain::{ActivityLevel, FeatureVector, NUM_CLASSES, NUM_FEATURES};
use crate::error::{Result, ServerError};
use crate::ml::dense::{softmax_in_place, DenseNetwork};

/// A loaded model mapping the feature array to per-class scores.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;
    fn scores(&self, input: &[f64]) -> Result<Vec<f64>>;
}

impl Classifier for DenseNetwork {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        DenseNetwork::output_dim(self)
    }

    fn scores(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.forward(input)
    }
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub class_index: usize,
    pub probabilities: [f64; NUM_CLASSES],
}

impl Classification {
    pub fn level(&self) -> ActivityLevel {
        // class_index is produced by argmax over NUM_CLASSES entries
        ActivityLevel::ALL[self.class_index]
    }
}

/// Read-only handle to the classifier, shared across request tasks
#[derive(Clone)]
pub struct InferenceService {
    model: Arc<dyn Classifier>,
    source: String,
}

impl fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceService")
            .field("source", &self.source)
            .field("model", &self.model)
            .finish()
    }
}

impl InferenceService {
    /// Wrap an already-built model, checking it has the 5-in / 5-out shape.
    pub fn new(model: Arc<dyn Classifier>, source: impl Into<String>) -> Result<Self> {
        if model.input_dim() != NUM_FEATURES {
            return Err(ServerError::ModelUnavailable(format!(
                "model expects {} inputs, features provide {}",
                model.input_dim(),
                NUM_FEATURES
            )));
        }
        if model.output_dim() != NUM_CLASSES {
            return Err(ServerError::ModelUnavailable(format!(
                "model produces {} outputs, expected {} classes",
                model.output_dim(),
                NUM_CLASSES
            )));
        }
        Ok(Self {
            model,
            source: source.into(),
        })
    }

    /// Load a model artifact by path. `.onnx` files need the `onnx` feature;
    /// anything else is read as a JSON dense network.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let is_onnx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("onnx"));

        let model: Arc<dyn Classifier> = if is_onnx {
            load_onnx(path)?
        } else {
            let net = DenseNetwork::from_file(path).map_err(|e| {
                ServerError::ModelUnavailable(format!("failed to load {source}: {e}"))
            })?;
            Arc::new(net)
        };

        let service = Self::new(model, source)?;
        info!(model = %service.source, "Classifier loaded");
        Ok(service)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Classify one feature vector.
    ///
    /// Scores that are not already a distribution are softmax-normalized.
    /// Ties go to the lowest class index.
    pub fn classify(&self, features: &FeatureVector) -> Result<Classification> {
        let input = features.as_array();
        let scores = self.model.scores(&input).map_err(|e| match e {
            ServerError::ModelUnavailable(_) => e,
            other => ServerError::ModelUnavailable(format!("inference failed: {other}")),
        })?;

        if scores.len() != NUM_CLASSES {
            return Err(ServerError::ModelUnavailable(format!(
                "model returned {} scores, expected {}",
                scores.len(),
                NUM_CLASSES
            )));
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ServerError::ModelUnavailable(
                "model returned non-finite scores".to_string(),
            ));
        }

        let mut probabilities = [0.0; NUM_CLASSES];
        probabilities.copy_from_slice(&scores);
        if !is_distribution(&probabilities) {
            softmax_in_place(&mut probabilities);
        }

        Ok(Classification {
            class_index: argmax(&probabilities),
            probabilities,
        })
    }
}

fn is_distribution(p: &[f64]) -> bool {
    p.iter().all(|v| *v >= 0.0) && (p.iter().sum::<f64>() - 1.0).abs() <= 1e-6
}

/// Index of the first maximum.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<Arc<dyn Classifier>> {
    let model = crate::ml::onnx::OnnxModel::load(path, NUM_FEATURES)?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<Arc<dyn Classifier>> {
    Err(ServerError::ModelUnavailable(format!(
        "{} is an ONNX model; rebuild with `--features onnx`",
        path.display()
    )))
}
