use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::domain::features::{json_type, present_value};
use crate::domain::FeatureVector;

// ============================================================================
// Requests
// ============================================================================

/// POST /predict body
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub user_id: String,
    pub features: FeatureVector,
}

/// Wire shape of a predict body; fields are typed only after presence checks
#[derive(Debug, Deserialize)]
struct RawPredictRequest {
    #[serde(default, deserialize_with = "present_value")]
    user_id: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    features: Option<Value>,
}

impl PredictRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let raw: RawPredictRequest = parse_object(body)?;
        let user_id = require("user_id", raw.user_id)?;
        let features = require("features", raw.features)?;

        Ok(Self {
            user_id: user_id_string(user_id)?,
            features: FeatureVector::from_json(&features)?,
        })
    }
}

/// POST /user body
#[derive(Debug, Clone, PartialEq)]
pub struct UserRequest {
    pub user_id: String,
    pub user_data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawUserRequest {
    #[serde(default, deserialize_with = "present_value")]
    user_id: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    user_data: Option<Value>,
}

impl UserRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let raw: RawUserRequest = parse_object(body)?;
        let user_id = require("user_id", raw.user_id)?;
        let user_data = require("user_data", raw.user_data)?;

        let user_data = match user_data {
            Value::Object(map) => map,
            other => {
                return Err(ApiError::InvalidInput(format!(
                    "user_data must be an object, got {}",
                    json_type(&other)
                )))
            }
        };
        Ok(Self {
            user_id: user_id_string(user_id)?,
            user_data,
        })
    }
}

/// Decode a body that must be a JSON object into its wire shape.
///
/// The object check comes first: serde would otherwise accept a JSON array
/// positionally for a struct.
fn parse_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::MalformedRequest(format!("invalid JSON body: {e}")))?;
    if !value.is_object() {
        return Err(ApiError::MalformedRequest(format!(
            "body must be a JSON object, got {}",
            json_type(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| ApiError::MalformedRequest(e.to_string()))
}

fn require(field: &str, slot: Option<Value>) -> Result<Value, ApiError> {
    slot.ok_or_else(|| ApiError::MalformedRequest(format!("missing field: {field}")))
}

fn user_id_string(value: Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::String(_) => Err(ApiError::InvalidInput(
            "user_id must not be empty".to_string(),
        )),
        other => Err(ApiError::InvalidInput(format!(
            "user_id must be a string, got {}",
            json_type(&other)
        ))),
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Single-row batch: the class is wrapped in a one-element array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_class: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub store_backend: String,
    pub model: String,
    pub uptime_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_missing_features_is_malformed() {
        let err = PredictRequest::from_body(br#"{"user_id": "u1"}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_request");
    }

    #[test]
    fn predict_request_rejects_non_json() {
        let err = PredictRequest::from_body(b"user_id=u1").unwrap_err();
        assert_eq!(err.kind(), "malformed_request");
        let err = PredictRequest::from_body(b"[1,2]").unwrap_err();
        assert_eq!(err.kind(), "malformed_request");
    }

    #[test]
    fn predict_request_numeric_user_id_is_invalid() {
        let err = PredictRequest::from_body(
            br#"{"user_id": 7, "features": {"avg_steps": 1, "frequency_run": 0,
                "frequency_bike": 0, "active_job": true, "gym_amount": 0}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn predict_request_parses() {
        let req = PredictRequest::from_body(
            br#"{"user_id": "u1", "features": {"avg_steps": 5000, "frequency_run": 2,
                "frequency_bike": 0, "active_job": false, "gym_amount": 1}}"#,
        )
        .unwrap();
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.features.as_array(), [5000.0, 2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn user_request_requires_object_data() {
        let err = UserRequest::from_body(br#"{"user_id": "u1", "user_data": [1]}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = UserRequest::from_body(br#"{"user_data": {}}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_request");

        let req = UserRequest::from_body(br#"{"user_id": "u1", "user_data": {"age": 30}}"#).unwrap();
        assert_eq!(req.user_data.get("age"), Some(&Value::from(30)));
    }

    #[test]
    fn null_user_id_is_invalid_not_missing() {
        let err = UserRequest::from_body(br#"{"user_id": null, "user_data": {}}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = PredictRequest::from_body(br#"{"user_id": "u1", "features": null}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_request");
    }
}
