use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapters::{ActivityStore, ProfileStore, StoreHealth};
use crate::config::PersistPolicy;
use crate::ml::InferenceService;
use crate::services::Metrics;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded classifier, read-only for the process lifetime
    pub inference: InferenceService,

    /// Append-only prediction history
    pub activities: Arc<dyn ActivityStore>,

    /// User profiles
    pub profiles: Arc<dyn ProfileStore>,

    /// Store liveness for `/health`
    pub store_health: Arc<dyn StoreHealth>,

    /// What `/predict` does when the activity insert fails
    pub persist_policy: PersistPolicy,

    pub metrics: Arc<Metrics>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// State backed by a single store serving both collections
    pub fn new<S>(inference: InferenceService, store: Arc<S>, persist_policy: PersistPolicy) -> Self
    where
        S: ActivityStore + ProfileStore + StoreHealth + 'static,
    {
        Self::with_stores(
            inference,
            store.clone(),
            store.clone(),
            store,
            persist_policy,
        )
    }

    pub fn with_stores(
        inference: InferenceService,
        activities: Arc<dyn ActivityStore>,
        profiles: Arc<dyn ProfileStore>,
        store_health: Arc<dyn StoreHealth>,
        persist_policy: PersistPolicy,
    ) -> Self {
        Self {
            inference,
            activities,
            profiles,
            store_health,
            persist_policy,
            metrics: Arc::new(Metrics::new()),
            start_time: Utc::now(),
        }
    }

    /// Get system uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
