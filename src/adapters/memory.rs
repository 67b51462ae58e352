//! In-process store for development and tests.
//!
//! Same merge and append semantics as the Postgres backend; contents are
//! lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{ActivityStore, ProfileStore, StoreHealth};
use crate::domain::{merge_profile_data, PredictionRecord, UserProfile};
use crate::error::Result;

#[derive(Default)]
pub struct MemoryStore {
    activities: RwLock<Vec<PredictionRecord>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn activity_count(&self) -> usize {
        self.activities.read().await.len()
    }

    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_activity(&self, record: &PredictionRecord) -> Result<()> {
        self.activities.write().await.push(record.clone());
        debug!(user_id = %record.user_id, prediction = record.prediction, "Activity recorded");
        Ok(())
    }

    async fn activities_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>> {
        Ok(self
            .activities
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, user_id: &str, patch: Map<String, Value>) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile {
                user_id: user_id.to_string(),
                data: Map::new(),
                updated_at: Utc::now(),
            });
        merge_profile_data(&mut profile.data, patch);
        profile.updated_at = Utc::now();
        debug!(user_id, fields = profile.data.len(), "Profile upserted");
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
