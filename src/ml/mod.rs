//! Classifier loading and inference.
//!
//! Dense JSON networks are always available; ONNX artifacts load through
//! `tract` when built with the `onnx` feature.

pub mod classifier;
pub mod dense;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{argmax, Classification, Classifier, InferenceService};
pub use dense::{Activation, DenseLayer, DenseNetwork};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
