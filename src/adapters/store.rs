use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{PredictionRecord, UserProfile};
use crate::error::Result;

/// Append-only log of prediction events (`user_activities`)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert one record. A single insert is the atomic unit.
    async fn insert_activity(&self, record: &PredictionRecord) -> Result<()>;

    /// Records for a user, oldest first.
    async fn activities_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>>;
}

/// User profiles keyed by `user_id` (`user_profiles`)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create the profile if absent, otherwise overwrite each key in `patch`
    /// and leave other keys untouched.
    async fn upsert_profile(&self, user_id: &str, patch: Map<String, Value>) -> Result<()>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Backend liveness, used by `/health`
#[async_trait]
pub trait StoreHealth: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<()>;
}
