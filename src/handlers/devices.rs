use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List all registered devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.store.list_devices().await?;
    Ok(Json(devices))
}

pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .get_device(id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    Ok(Json(device))
}

/// Register a device
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    if req.name.trim().is_empty() && req.hostname.trim().is_empty() {
        return Err(ApiError::bad_request("name or hostname is required"));
    }
    if req.ip.parse::<std::net::IpAddr>().is_err() {
        return Err(ApiError::bad_request("invalid IP address"));
    }
    if let Some(port) = req.ssh_port {
        if !(1..=65535).contains(&port) {
            return Err(ApiError::bad_request("ssh_port must be between 1 and 65535"));
        }
    }
    let device = state.store.create_device(&req).await?;
    tracing::info!("Registered device {} ({}, {})", device.id, device.label(), device.ip);
    Ok(created(device))
}

pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_device(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/devices/:id/neighbors
pub async fn list_neighbors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Neighbor>>, ApiError> {
    let neighbors = state.store.list_neighbors(id).await?;
    Ok(Json(neighbors))
}

/// GET /api/devices/:id/interfaces
pub async fn list_interfaces(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DeviceInterface>>, ApiError> {
    let interfaces = state.store.list_interfaces(id).await?;
    Ok(Json(interfaces))
}
