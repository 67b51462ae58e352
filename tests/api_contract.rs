use activity_server::{
    adapters::{ActivityStore, MemoryStore, ProfileStore, StoreHealth},
    api::create_router,
    config::PersistPolicy,
    domain::{FeatureVector, PredictionRecord, UserProfile},
    error::{Result, ServerError},
    ml::InferenceService,
    AppState,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

mockall::mock! {
    pub DownStore {}

    #[async_trait]
    impl ActivityStore for DownStore {
        async fn insert_activity(&self, record: &PredictionRecord) -> Result<()>;
        async fn activities_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>>;
    }

    #[async_trait]
    impl ProfileStore for DownStore {
        async fn upsert_profile(&self, user_id: &str, patch: Map<String, Value>) -> Result<()>;
        async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    }

    #[async_trait]
    impl StoreHealth for DownStore {
        fn backend_name(&self) -> &'static str;
        async fn ping(&self) -> Result<()>;
    }
}

fn down_store() -> MockDownStore {
    let mut store = MockDownStore::new();
    store
        .expect_insert_activity()
        .returning(|_| Err(ServerError::Storage("connection refused".into())));
    store
        .expect_upsert_profile()
        .returning(|_, _| Err(ServerError::Storage("connection refused".into())));
    store
        .expect_ping()
        .returning(|| Err(ServerError::Storage("connection refused".into())));
    store.expect_backend_name().return_const("down");
    store
}

fn inference() -> InferenceService {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/activity_model.json");
    InferenceService::load(path).expect("bundled model must load")
}

struct TestContext {
    app: Router,
    store: Arc<MemoryStore>,
}

impl TestContext {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(inference(), store.clone(), PersistPolicy::Strict);
        Self {
            app: create_router(state),
            store,
        }
    }
}

fn down_app(policy: PersistPolicy) -> Router {
    let store = Arc::new(down_store());
    create_router(AppState::new(inference(), store, policy))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, String) {
    let request_builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(raw) => request_builder
            .header("content-type", "application/json")
            .body(Body::from(raw.to_string()))
            .expect("failed to build json request"),
        None => request_builder
            .body(Body::empty())
            .expect("failed to build empty request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn send_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::POST, uri, Some(&payload.to_string())).await;
    let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, value)
}

fn predict_payload(user_id: &str) -> Value {
    json!({
        "user_id": user_id,
        "features": {
            "avg_steps": 5000,
            "frequency_run": 2,
            "frequency_bike": 0,
            "active_job": false,
            "gym_amount": 1
        }
    })
}

#[tokio::test]
async fn root_reports_running() {
    let ctx = TestContext::new();
    let (status, body) = send(&ctx.app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"message": "ML Model Server Running"})
    );
}

#[tokio::test]
async fn root_is_independent_of_store() {
    let app = down_app(PersistPolicy::Strict);
    let (status, _) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("disconnected"));
}

#[tokio::test]
async fn predict_returns_single_class_and_appends_record() {
    let ctx = TestContext::new();
    let (status, body) = send_json(&ctx.app, "/predict", predict_payload("u1")).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let classes = body["predicted_class"].as_array().expect("array");
    assert_eq!(classes.len(), 1);
    let k = classes[0].as_u64().expect("integer class");
    assert!(k <= 4);

    let records = ctx.store.activities_for_user("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "u1");
    assert_eq!(records[0].features, [5000.0, 2.0, 0.0, 0.0, 1.0]);
    assert_eq!(records[0].prediction as u64, k);
}

#[tokio::test]
async fn predict_matches_direct_classification() {
    let ctx = TestContext::new();
    let expected = inference()
        .classify(&FeatureVector::new(5000.0, 2.0, 0.0, false, 1.0).unwrap())
        .unwrap()
        .class_index;

    for _ in 0..3 {
        let (_, body) = send_json(&ctx.app, "/predict", predict_payload("u1")).await;
        assert_eq!(body["predicted_class"], json!([expected]));
    }
    // Not idempotent: each call appends.
    assert_eq!(ctx.store.activity_count().await, 3);
}

#[tokio::test]
async fn predict_without_features_is_400_and_writes_nothing() {
    let ctx = TestContext::new();
    let (status, body) = send_json(&ctx.app, "/predict", json!({"user_id": "u1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_request");
    assert_eq!(ctx.store.activity_count().await, 0);
}

#[tokio::test]
async fn predict_rejects_bad_payloads_without_side_effects() {
    let ctx = TestContext::new();

    let (status, _) = send(&ctx.app, Method::POST, "/predict", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut payload = predict_payload("u1");
    payload["features"]["avg_steps"] = json!("lots");
    let (status, body) = send_json(&ctx.app, "/predict", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let mut payload = predict_payload("u1");
    payload["features"]["frequency_run"] = json!(-1);
    let (status, body) = send_json(&ctx.app, "/predict", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let mut payload = predict_payload("u1");
    payload["features"]
        .as_object_mut()
        .unwrap()
        .remove("gym_amount");
    let (status, body) = send_json(&ctx.app, "/predict", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_request");

    assert_eq!(ctx.store.activity_count().await, 0);
}

#[tokio::test]
async fn user_upsert_merges_fields_across_calls() {
    let ctx = TestContext::new();

    let (status, body) = send_json(
        &ctx.app,
        "/user",
        json!({"user_id": "u1", "user_data": {"age": 30, "weight": 70}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "User data stored"}));

    let (status, _) = send_json(
        &ctx.app,
        "/user",
        json!({"user_id": "u1", "user_data": {"weight": 72, "goal": "maintain"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(ctx.store.profile_count().await, 1);
    let profile = ctx.store.get_profile("u1").await.unwrap().unwrap();
    assert_eq!(
        Value::Object(profile.data),
        json!({"age": 30, "weight": 72, "goal": "maintain"})
    );
}

#[tokio::test]
async fn user_requires_user_data_object() {
    let ctx = TestContext::new();
    let (status, body) = send_json(&ctx.app, "/user", json!({"user_id": "u1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_request");

    let (status, body) =
        send_json(&ctx.app, "/user", json!({"user_id": "u1", "user_data": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(ctx.store.profile_count().await, 0);
}

#[tokio::test]
async fn strict_store_failure_is_500() {
    let app = down_app(PersistPolicy::Strict);

    let (status, body) = send_json(&app, "/predict", predict_payload("u1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_error");

    let (status, body) = send_json(
        &app,
        "/user",
        json!({"user_id": "u1", "user_data": {"age": 30}}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "storage_error");
}

#[tokio::test]
async fn best_effort_store_failure_still_predicts() {
    let app = down_app(PersistPolicy::BestEffort);
    let (status, body) = send_json(&app, "/predict", predict_payload("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_class"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn health_and_metrics_report_activity() {
    let ctx = TestContext::new();
    send_json(&ctx.app, "/predict", predict_payload("u1")).await;
    send_json(&ctx.app, "/predict", json!({})).await;

    let (status, body) = send(&ctx.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["store_backend"], "memory");

    let (status, text) = send(&ctx.app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("activity_predictions_total 1"));
    assert!(text.contains("activity_rejected_requests_total 1"));
}
