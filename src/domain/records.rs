use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::features::{FeatureVector, NUM_FEATURES};

/// One prediction event, appended to the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Model input exactly as classified
    pub features: [f64; NUM_FEATURES],
    pub prediction: i32,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(user_id: impl Into<String>, features: &FeatureVector, class_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            features: features.as_array(),
            prediction: class_index as i32,
            created_at: Utc::now(),
        }
    }
}

/// Free-form user profile keyed by `user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub data: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to merge into a profile.
///
/// A `user_id` key inside the payload is dropped: the profile key comes from
/// the request envelope only.
pub fn profile_patch(mut user_data: Map<String, Value>) -> Map<String, Value> {
    user_data.remove("user_id");
    user_data
}

/// Shallow merge: every key in `patch` replaces the same key in `data`.
pub fn merge_profile_data(data: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (k, v) in patch {
        data.insert(k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_overwrites_and_keeps_untouched_fields() {
        let mut data = obj(json!({"age": 30, "weight": 70}));
        merge_profile_data(&mut data, obj(json!({"weight": 72, "goal": "bulk"})));
        assert_eq!(Value::Object(data), json!({"age": 30, "weight": 72, "goal": "bulk"}));
    }

    #[test]
    fn patch_drops_user_id() {
        let patch = profile_patch(obj(json!({"user_id": "other", "age": 30})));
        assert_eq!(Value::Object(patch), json!({"age": 30}));
    }

    #[test]
    fn record_captures_model_input() {
        let f = FeatureVector::new(5000.0, 2.0, 0.0, false, 1.0).unwrap();
        let r = PredictionRecord::new("u1", &f, 3);
        assert_eq!(r.features, [5000.0, 2.0, 0.0, 0.0, 1.0]);
        assert_eq!(r.prediction, 3);
        assert_eq!(r.user_id, "u1");
    }
}
