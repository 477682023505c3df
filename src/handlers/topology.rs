use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{created, ApiError};
use crate::models::*;
use crate::topology::LayoutParams;
use crate::AppState;

const MAX_LAYOUT_ITERATIONS: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    /// Annotate nodes with x/y coordinates
    #[serde(default)]
    pub layout: bool,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub padding: Option<f64>,
    pub iterations: Option<usize>,
}

impl GraphQuery {
    fn layout_params(&self) -> Result<LayoutParams, ApiError> {
        let defaults = LayoutParams::default();
        let params = LayoutParams {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            padding: self.padding.unwrap_or(defaults.padding),
            iterations: self.iterations.unwrap_or(defaults.iterations).min(MAX_LAYOUT_ITERATIONS),
            ..defaults
        };
        let valid = [params.width, params.height, params.padding]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if !valid || params.width <= 2.0 * params.padding || params.height <= 2.0 * params.padding {
            return Err(ApiError::bad_request("canvas must be larger than twice the padding"));
        }
        Ok(params)
    }
}

/// GET /api/topology: node/edge graph, optionally laid out
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<TopologyGraph>, ApiError> {
    let graph = TopologyGraph::load(&state.store).await?;
    if !query.layout {
        return Ok(Json(graph));
    }
    let params = query.layout_params()?;
    Ok(Json(graph.with_layout(&params)))
}

/// POST /api/topology/auto-link: create links for resolved neighbors
pub async fn auto_link(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AutoLinkReport>, ApiError> {
    let report = state.inference.auto_link_sweep().await?;
    Ok(Json(report))
}

pub async fn list_links(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Link>>, ApiError> {
    let links = state.store.list_links().await?;
    Ok(Json(links))
}

/// POST /api/links: declare a link by hand
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>), ApiError> {
    if req.link_type.trim().is_empty() {
        return Err(ApiError::bad_request("link_type must not be empty"));
    }
    let link = state.store.create_link(&req).await?;
    Ok(created(link))
}

pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_link(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
