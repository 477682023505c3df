use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json};
use crate::{models::*, handlers::{created, ApiError}, AppState};

pub async fn list_credentials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Credential>>, ApiError> {
    let credentials = state.store.list_credentials().await?;
    Ok(Json(credentials))
}

pub async fn create_credential(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<Credential>), ApiError> {
    if req.name.trim().is_empty() || req.username.trim().is_empty() {
        return Err(ApiError::bad_request("name and username are required"));
    }
    let credential = state.store.create_credential(&req).await?;
    Ok(created(credential))
}

pub async fn delete_credential(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_credential(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
