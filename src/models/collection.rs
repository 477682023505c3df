use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::records::{InterfaceRecord, NeighborRecord, RoutingPeerRecord, SystemInfo};

/// Canonical collection attempt status values
pub mod collection_status {
    pub const PENDING: &str = "pending";
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// Logical operation the collector can run against a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    GetNeighbors,
    GetOspfPeers,
    GetInterfaces,
    GetSystemInfo,
    TestConnection,
}

impl Operation {
    /// Everything a full discovery pass runs, in the default order
    pub const DISCOVERY: [Operation; 4] = [
        Operation::GetSystemInfo,
        Operation::GetInterfaces,
        Operation::GetNeighbors,
        Operation::GetOspfPeers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetNeighbors => "get-neighbors",
            Operation::GetOspfPeers => "get-ospf-peers",
            Operation::GetInterfaces => "get-interfaces",
            Operation::GetSystemInfo => "get-system-info",
            Operation::TestConnection => "test-connection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "get-neighbors" => Some(Operation::GetNeighbors),
            "get-ospf-peers" => Some(Operation::GetOspfPeers),
            "get-interfaces" => Some(Operation::GetInterfaces),
            "get-system-info" => Some(Operation::GetSystemInfo),
            "test-connection" => Some(Operation::TestConnection),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CollectionAttempt is one orchestrator run against one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionAttempt {
    pub id: String,
    pub device_id: i64,
    pub operations: Vec<Operation>,
    pub status: String,
    /// Raw command output keyed by operation name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Structured records parsed during one collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedCollection {
    #[serde(default)]
    pub neighbors: Vec<NeighborRecord>,
    #[serde(default)]
    pub routing_peers: Vec<RoutingPeerRecord>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<SystemInfo>,
}

/// OperationError records a single operation the device refused
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    pub operation: Operation,
    pub error: String,
}

/// CollectionOutcome is what a collect call reports back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub attempt_id: String,
    pub device_id: i64,
    pub success: bool,
    pub message: String,
    pub result: ParsedCollection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operation_errors: Vec<OperationError>,
    pub links_created: u32,
    pub links_updated: u32,
}

/// BatchItem is one device's slot in a batch collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub device_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CollectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// ConnectionTest is the result of a single test command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub device_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

fn default_operations() -> Vec<Operation> {
    Operation::DISCOVERY.to_vec()
}

/// CollectRequest selects the operations for a single-device collection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectRequest {
    #[serde(default = "default_operations")]
    pub operations: Vec<Operation>,
}

/// BatchCollectRequest runs the same operations over several devices
#[derive(Debug, Clone, Deserialize)]
pub struct BatchCollectRequest {
    pub device_ids: Vec<i64>,
    #[serde(default = "default_operations")]
    pub operations: Vec<Operation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip_through_serde() {
        for op in Operation::DISCOVERY.iter().chain([Operation::TestConnection].iter()) {
            let json = serde_json::to_string(op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.as_str()));
            assert_eq!(Operation::parse(op.as_str()), Some(*op));
        }
        assert_eq!(Operation::parse("get-bgp-peers"), None);
    }

    #[test]
    fn test_collect_request_defaults_to_discovery() {
        let req: CollectRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.operations, Operation::DISCOVERY.to_vec());

        let req: CollectRequest =
            serde_json::from_str(r#"{"operations": ["get-neighbors"]}"#).unwrap();
        assert_eq!(req.operations, vec![Operation::GetNeighbors]);
    }
}
