use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::{ApiError, LimitQuery};
use crate::models::*;
use crate::AppState;

/// Upper bound on devices in one batch request
const MAX_BATCH_DEVICES: usize = 500;

/// POST /api/devices/:id/collect: run a collection against one device
pub async fn collect_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CollectRequest>,
) -> Result<Json<CollectionOutcome>, ApiError> {
    let outcome = state.collector.collect(id, &req.operations).await?;
    Ok(Json(outcome))
}

/// POST /api/collect/batch: collect from several devices
pub async fn collect_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchCollectRequest>,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    if req.device_ids.is_empty() {
        return Err(ApiError::bad_request("device_ids is required"));
    }
    if req.device_ids.len() > MAX_BATCH_DEVICES {
        return Err(ApiError::bad_request(format!(
            "at most {} devices per batch",
            MAX_BATCH_DEVICES
        )));
    }
    if req.operations.is_empty() {
        return Err(ApiError::bad_request("operations must not be empty"));
    }
    let items = state.collector.collect_batch(&req.device_ids, &req.operations).await;
    Ok(Json(items))
}

/// POST /api/devices/:id/test: run the vendor's test command
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ConnectionTest>, ApiError> {
    let result = state.collector.test_connection(id).await?;
    Ok(Json(result))
}

/// GET /api/devices/:id/attempts: most recent first
pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<CollectionAttempt>>, ApiError> {
    let attempts = state.store.list_attempts(id, query.sanitize()).await?;
    Ok(Json(attempts))
}

/// GET /api/attempts/:id
pub async fn get_attempt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CollectionAttempt>, ApiError> {
    let attempt = state
        .store
        .get_attempt(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("collection attempt"))?;
    Ok(Json(attempt))
}
