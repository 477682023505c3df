use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // Device registry
        .route("/api/devices", get(handlers::devices::list_devices))
        .route("/api/devices", post(handlers::devices::create_device))
        .route("/api/devices/:id", get(handlers::devices::get_device))
        .route("/api/devices/:id", delete(handlers::devices::delete_device))
        .route("/api/devices/:id/neighbors", get(handlers::devices::list_neighbors))
        .route("/api/devices/:id/interfaces", get(handlers::devices::list_interfaces))
        // Credentials
        .route("/api/credentials", get(handlers::credentials::list_credentials))
        .route("/api/credentials", post(handlers::credentials::create_credential))
        .route("/api/credentials/:id", delete(handlers::credentials::delete_credential))
        // Collection
        .route("/api/devices/:id/collect", post(handlers::collection::collect_device))
        .route("/api/devices/:id/test", post(handlers::collection::test_connection))
        .route("/api/devices/:id/attempts", get(handlers::collection::list_attempts))
        .route("/api/collect/batch", post(handlers::collection::collect_batch))
        .route("/api/attempts/:id", get(handlers::collection::get_attempt))
        // Topology
        .route("/api/topology", get(handlers::topology::get_graph))
        .route("/api/topology/auto-link", post(handlers::topology::auto_link))
        .route("/api/links", get(handlers::topology::list_links))
        .route("/api/links", post(handlers::topology::create_link))
        .route("/api/links/:id", delete(handlers::topology::delete_link))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
