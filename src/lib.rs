//! LinkMap: collects neighbor, routing-peer, interface and identity data
//! from network devices over SSH, infers the physical topology from it and
//! serves the result as a laid-out graph.

pub mod collection;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod parsers;
pub mod router;
pub mod ssh;
pub mod topology;

use std::sync::Arc;

use collection::Collector;
use db::Store;
use topology::LinkInference;

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub collector: Arc<Collector>,
    pub inference: Arc<LinkInference>,
}
