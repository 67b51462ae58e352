use axum::{body::Bytes, extract::State, Json};
use tracing::{error, info, instrument, warn};

use crate::api::{
    error::ApiError,
    state::AppState,
    types::{PredictRequest, PredictResponse},
};
use crate::config::PersistPolicy;
use crate::domain::PredictionRecord;

/// POST /predict
///
/// Parse, validate, classify, append one activity record, respond. Nothing is
/// written unless parsing and inference both succeed; a failed write never
/// re-runs the classifier.
#[instrument(skip_all, fields(user_id))]
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let req = PredictRequest::from_body(&body).map_err(|e| {
        state.metrics.inc_rejected();
        warn!(error = %e, "Rejected predict request");
        e
    })?;
    tracing::Span::current().record("user_id", req.user_id.as_str());

    let classification = state.inference.classify(&req.features).map_err(|e| {
        error!(error = %e, "Inference failed");
        ApiError::from(e)
    })?;
    let class_index = classification.class_index;
    state.metrics.record_prediction(class_index);

    let record = PredictionRecord::new(&req.user_id, &req.features, class_index);
    if let Err(e) = state.activities.insert_activity(&record).await {
        state.metrics.inc_store_failures();
        match state.persist_policy {
            PersistPolicy::Strict => {
                error!(error = %e, class = class_index, "Failed to store activity");
                return Err(ApiError::StorageError(e.to_string()));
            }
            PersistPolicy::BestEffort => {
                warn!(error = %e, class = class_index, "Failed to store activity, returning prediction anyway");
            }
        }
    }

    info!(
        class = class_index,
        level = %classification.level(),
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        predicted_class: vec![class_index],
    }))
}
