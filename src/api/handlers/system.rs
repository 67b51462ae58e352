use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::api::{
    state::AppState,
    types::{HealthResponse, MessageResponse},
};

/// GET / -- static liveness message; touches neither model nor store
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("ML Model Server Running"))
}

/// GET /health -- readiness: the model is loaded by construction, the store is pinged
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_status = match state.store_health.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            "disconnected".to_string()
        }
    };

    let ok = store_status == "connected";
    let resp = HealthResponse {
        status: if ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        store: store_status,
        store_backend: state.store_health.backend_name().to_string(),
        model: state.inference.source().to_string(),
        uptime_secs: state.uptime_seconds(),
    };

    if ok {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}

/// GET /metrics -- Prometheus text format
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store_up = state.store_health.ping().await.is_ok();
    let body = state.metrics.render(state.uptime_seconds(), store_up);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
