pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ml;
pub mod services;

pub use adapters::{ActivityStore, MemoryStore, PostgresStore, ProfileStore, StoreHealth};
pub use api::{create_router, ApiError, AppState};
pub use config::{AppConfig, PersistPolicy, StoreBackend};
pub use domain::{ActivityLevel, FeatureVector, PredictionRecord, UserProfile};
pub use error::{Result, ServerError};
pub use ml::{Classification, InferenceService};
