use serde::{Deserialize, Serialize};

use super::devices::Vendor;

/// GraphNode is a device summary for the visualization layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    pub label: String,
    pub hostname: String,
    pub ip: String,
    pub vendor: Vendor,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// GraphEdge is a link summary for the visualization layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_interface: Option<String>,
    pub link_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
}

/// TopologyGraph is the full node/edge set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// NodePosition is one laid-out node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

/// InferenceSummary counts what recording a batch of neighbors did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceSummary {
    pub neighbors: u32,
    pub resolved: u32,
    pub links_created: u32,
    pub links_updated: u32,
}

/// AutoLinkReport is the result of an auto-link sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoLinkReport {
    pub scanned: u32,
    pub created: u32,
    pub existing: u32,
    pub skipped: u32,
}
