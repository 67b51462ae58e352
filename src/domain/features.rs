//! Model input features.
//!
//! The classifier was fit on five columns in a fixed order; `FeatureVector`
//! is the only way to build that input, so the order cannot drift between
//! the HTTP layer, the CLI and the stored activity records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Number of model input features
pub const NUM_FEATURES: usize = 5;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "avg_steps",
    "frequency_run",
    "frequency_bike",
    "active_job",
    "gym_amount",
];

/// Why a feature payload could not be turned into a `FeatureVector`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("features must be a JSON object")]
    NotAnObject,

    #[error("missing feature: {0}")]
    Missing(&'static str),

    #[error("invalid feature {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl FeatureError {
    /// Missing keys and wrong shapes are request-structure problems, not value problems.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::NotAnObject | Self::Missing(_))
    }
}

/// The five activity features, in model input order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_steps: f64,
    pub frequency_run: f64,
    pub frequency_bike: f64,
    pub active_job: bool,
    pub gym_amount: f64,
}

impl FeatureVector {
    /// Build a vector, rejecting negative or non-finite numeric fields.
    pub fn new(
        avg_steps: f64,
        frequency_run: f64,
        frequency_bike: f64,
        active_job: bool,
        gym_amount: f64,
    ) -> Result<Self, FeatureError> {
        let v = Self {
            avg_steps,
            frequency_run,
            frequency_bike,
            active_job,
            gym_amount,
        };
        v.validate()?;
        Ok(v)
    }

    /// Parse the `features` object of a predict request.
    ///
    /// All five keys are checked for presence before any value is coerced, so
    /// a payload that is both incomplete and mistyped reports the missing key.
    pub fn from_json(value: &Value) -> Result<Self, FeatureError> {
        if !value.is_object() {
            return Err(FeatureError::NotAnObject);
        }
        let raw = RawFeatures::deserialize(value).map_err(|_| FeatureError::NotAnObject)?;
        if let Some(name) = raw.first_missing() {
            return Err(FeatureError::Missing(name));
        }

        Self::new(
            number("avg_steps", present("avg_steps", raw.avg_steps.as_ref())?)?,
            number("frequency_run", present("frequency_run", raw.frequency_run.as_ref())?)?,
            number("frequency_bike", present("frequency_bike", raw.frequency_bike.as_ref())?)?,
            boolean("active_job", present("active_job", raw.active_job.as_ref())?)?,
            number("gym_amount", present("gym_amount", raw.gym_amount.as_ref())?)?,
        )
    }

    fn validate(&self) -> Result<(), FeatureError> {
        let numeric = [
            ("avg_steps", self.avg_steps),
            ("frequency_run", self.frequency_run),
            ("frequency_bike", self.frequency_bike),
            ("gym_amount", self.gym_amount),
        ];
        for (field, v) in numeric {
            if !v.is_finite() {
                return Err(FeatureError::Invalid {
                    field,
                    reason: "must be a finite number".to_string(),
                });
            }
            if v < 0.0 {
                return Err(FeatureError::Invalid {
                    field,
                    reason: format!("must be >= 0, got {v}"),
                });
            }
        }
        Ok(())
    }

    /// Model input, `active_job` encoded as 0.0 / 1.0 at index 3.
    pub fn as_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.avg_steps,
            self.frequency_run,
            self.frequency_bike,
            if self.active_job { 1.0 } else { 0.0 },
            self.gym_amount,
        ]
    }
}

/// Wire shape of the `features` object; typing happens after presence checks.
#[derive(Debug, Deserialize)]
struct RawFeatures {
    #[serde(default, deserialize_with = "present_value")]
    avg_steps: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    frequency_run: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    frequency_bike: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    active_job: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    gym_amount: Option<Value>,
}

impl RawFeatures {
    fn first_missing(&self) -> Option<&'static str> {
        let slots = [
            &self.avg_steps,
            &self.frequency_run,
            &self.frequency_bike,
            &self.active_job,
            &self.gym_amount,
        ];
        FEATURE_NAMES
            .iter()
            .zip(slots)
            .find(|(_, slot)| slot.is_none())
            .map(|(name, _)| *name)
    }
}

/// Keeps an explicit `null` distinct from an absent key: absent is `None`
/// (via `#[serde(default)]`), anything present, `null` included, is `Some`.
pub(crate) fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn present<'a>(field: &'static str, slot: Option<&'a Value>) -> Result<&'a Value, FeatureError> {
    slot.ok_or(FeatureError::Missing(field))
}

fn number(field: &'static str, value: &Value) -> Result<f64, FeatureError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| FeatureError::Invalid {
            field,
            reason: "not representable as f64".to_string(),
        }),
        other => Err(FeatureError::Invalid {
            field,
            reason: format!("expected number, got {}", json_type(other)),
        }),
    }
}

fn boolean(field: &'static str, value: &Value) -> Result<bool, FeatureError> {
    match value {
        Value::Bool(b) => Ok(*b),
        // 0/1 integers are accepted as the boolean they encode
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(FeatureError::Invalid {
                field,
                reason: format!("expected boolean or 0/1, got {n}"),
            }),
        },
        other => Err(FeatureError::Invalid {
            field,
            reason: format!("expected boolean, got {}", json_type(other)),
        }),
    }
}

pub(crate) fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
