use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info, instrument};

use super::store::{ActivityStore, ProfileStore, StoreHealth};
use crate::domain::{PredictionRecord, UserProfile, NUM_FEATURES};
use crate::error::Result;

/// PostgreSQL storage adapter; documents live in JSONB columns
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

// ==================== Activities ====================

#[async_trait]
impl ActivityStore for PostgresStore {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn insert_activity(&self, record: &PredictionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_activities (id, user_id, features, prediction, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(Json(record.features))
        .bind(record.prediction as i16)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(prediction = record.prediction, "Inserted activity");
        Ok(())
    }

    async fn activities_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, features, prediction, created_at
            FROM user_activities
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(|r| {
                let Json(features): Json<[f64; NUM_FEATURES]> = r.get("features");
                PredictionRecord {
                    id: r.get("id"),
                    user_id: r.get("user_id"),
                    features,
                    prediction: i32::from(r.get::<i16, _>("prediction")),
                    created_at: r.get("created_at"),
                }
            })
            .collect();

        Ok(records)
    }
}

// ==================== Profiles ====================

#[async_trait]
impl ProfileStore for PostgresStore {
    #[instrument(skip(self, patch), fields(fields = patch.len()))]
    async fn upsert_profile(&self, user_id: &str, patch: Map<String, Value>) -> Result<()> {
        // `||` on jsonb is a shallow merge with right-hand keys winning.
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, data)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                data = user_profiles.data || EXCLUDED.data,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(Json(Value::Object(patch)))
        .execute(&self.pool)
        .await?;

        debug!("Upserted profile");
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, data, updated_at
            FROM user_profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let Json(data): Json<Value> = r.get("data");
            UserProfile {
                user_id: r.get("user_id"),
                data: match data {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
                updated_at: r.get("updated_at"),
            }
        }))
    }
}

#[async_trait]
impl StoreHealth for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
