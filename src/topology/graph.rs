use anyhow::Result;

use crate::db::Store;
use crate::models::*;

use super::layout::{force_layout, LayoutParams};

impl GraphNode {
    fn from_device(device: &Device) -> Self {
        Self {
            id: device.id,
            label: device.label().to_string(),
            hostname: device.hostname.clone(),
            ip: device.ip.clone(),
            vendor: device.vendor,
            status: device.status.clone(),
            x: None,
            y: None,
        }
    }
}

impl GraphEdge {
    fn from_link(link: &Link) -> Self {
        Self {
            id: link.id,
            source: link.source_device_id,
            target: link.target_device_id,
            source_interface: link.source_interface.clone(),
            target_interface: link.target_interface.clone(),
            link_type: link.link_type.clone(),
            status: link.status.clone(),
            bandwidth: link.bandwidth,
        }
    }
}

impl TopologyGraph {
    /// Graph of every registered device and link. Nodes are ordered by
    /// device id.
    pub async fn load(store: &Store) -> Result<Self> {
        let mut devices = store.list_devices().await?;
        devices.sort_by_key(|d| d.id);
        let links = store.list_links().await?;
        Ok(Self {
            nodes: devices.iter().map(GraphNode::from_device).collect(),
            edges: links.iter().map(GraphEdge::from_link).collect(),
        })
    }

    /// Annotate every node with force-layout coordinates
    pub fn with_layout(mut self, params: &LayoutParams) -> Self {
        let ids: Vec<i64> = self.nodes.iter().map(|n| n.id).collect();
        let edges: Vec<(i64, i64)> = self.edges.iter().map(|e| (e.source, e.target)).collect();
        let positions = force_layout(&ids, &edges, params);
        for (node, pos) in self.nodes.iter_mut().zip(positions) {
            node.x = Some(pos.x);
            node.y = Some(pos.y);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{device, store};

    #[tokio::test]
    async fn test_graph_reflects_registry_and_links() {
        let store = store().await;
        let a = device(&store, "core", "10.0.0.1", "huawei").await;
        let b = device(&store, "", "10.0.0.2", "cisco").await;
        store
            .create_link(&CreateLinkRequest {
                source_device_id: a.id,
                target_device_id: b.id,
                source_interface: Some("GE0/0/1".to_string()),
                target_interface: None,
                link_type: link_type::MANUAL.to_string(),
                bandwidth: None,
            })
            .await
            .unwrap();

        let graph = TopologyGraph::load(&store).await.unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].label, "core");
        assert_eq!(graph.nodes[0].vendor, Vendor::Huawei);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, a.id);
        assert_eq!(graph.edges[0].source_interface.as_deref(), Some("GE0/0/1"));
        assert!(graph.nodes.iter().all(|n| n.x.is_none()));

        let params = LayoutParams::default();
        let laid_out = graph.with_layout(&params);
        for node in &laid_out.nodes {
            let (x, y) = (node.x.unwrap(), node.y.unwrap());
            assert!(x >= params.padding && x <= params.width - params.padding);
            assert!(y >= params.padding && y <= params.height - params.padding);
        }
    }

    #[test]
    fn test_empty_graph_layout() {
        let graph = TopologyGraph::default().with_layout(&LayoutParams::default());
        assert!(graph.nodes.is_empty());
    }
}
