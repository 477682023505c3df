//! Neighbor persistence and link inference.
//!
//! Each observed neighbor is upserted by (device, local interface,
//! protocol), its remote end is resolved against the device registry, and
//! a discovered link is created or refreshed. Links are unique per
//! unordered device pair. All of it runs in one transaction per neighbor,
//! serialised by a process-wide mutex so concurrent collections cannot race
//! on the same pair.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tokio::sync::Mutex;

use crate::config::NeighborMatchPolicy;
use crate::db::{DeviceRepo, LinkRepo, NeighborRepo, NewLink, Store};
use crate::models::*;
use crate::parsers::looks_like_ipv4;

/// Shortest name fragment tried in substring matching
const MIN_FRAGMENT_LEN: usize = 3;

enum LinkChange {
    Created,
    Refreshed,
}

pub struct LinkInference {
    store: Store,
    policy: NeighborMatchPolicy,
    write_lock: Mutex<()>,
}

impl LinkInference {
    pub fn new(store: Store, policy: NeighborMatchPolicy) -> Self {
        Self {
            store,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> NeighborMatchPolicy {
        self.policy
    }

    /// Persist LLDP neighbors seen from `device_id` and infer links for the
    /// ones that resolve to a registered device
    pub async fn record_neighbors(&self, device_id: i64, records: &[NeighborRecord]) -> Result<InferenceSummary> {
        let mut summary = InferenceSummary::default();
        for record in records {
            let obs = NeighborObservation {
                local_interface: record.local_interface.clone(),
                protocol: Protocol::Lldp,
                remote_device_name: record.remote_device_name.clone(),
                remote_interface: record.remote_interface.clone(),
                remote_ip: record.remote_ip.clone(),
                raw_data: record.raw.clone(),
            };
            let ips: Vec<&str> = record.remote_ip.as_deref().into_iter().collect();

            let _guard = self.write_lock.lock().await;
            let mut tx = self.store.pool().begin().await?;
            let now = Utc::now();

            let neighbor_id = NeighborRepo::upsert(&mut tx, device_id, &obs, now).await?;
            let remote = self.resolve(&mut tx, device_id, &obs.remote_device_name, &ips).await?;
            NeighborRepo::set_remote_device(&mut tx, neighbor_id, remote).await?;

            summary.neighbors += 1;
            if let Some(remote_id) = remote {
                summary.resolved += 1;
                let change = ensure_link(
                    &mut tx,
                    device_id,
                    remote_id,
                    Some(obs.local_interface.as_str()),
                    obs.remote_interface.as_deref(),
                    now,
                )
                .await?;
                match change {
                    LinkChange::Created => summary.links_created += 1,
                    LinkChange::Refreshed => summary.links_updated += 1,
                }
            }

            tx.commit()
                .await
                .with_context(|| format!("Failed to commit neighbor {} of device {}", obs.local_interface, device_id))?;
        }

        tracing::info!(
            "Device {}: {} neighbors, {} resolved, {} links created, {} refreshed",
            device_id,
            summary.neighbors,
            summary.resolved,
            summary.links_created,
            summary.links_updated
        );
        Ok(summary)
    }

    /// Persist OSPF adjacencies as `ospf` neighbors. The remote end is
    /// resolved by router id and peer address; no link is created here.
    pub async fn record_routing_peers(&self, device_id: i64, peers: &[RoutingPeerRecord]) -> Result<InferenceSummary> {
        let mut summary = InferenceSummary::default();
        for peer in peers {
            let remote_ip = peer
                .address
                .clone()
                .or_else(|| looks_like_ipv4(&peer.router_id).then(|| peer.router_id.clone()));
            let obs = NeighborObservation {
                local_interface: peer.interface.clone(),
                protocol: Protocol::Ospf,
                remote_device_name: peer.router_id.clone(),
                remote_interface: None,
                remote_ip,
                raw_data: peer.raw.clone(),
            };
            let mut ips: Vec<&str> = Vec::new();
            if let Some(addr) = peer.address.as_deref() {
                ips.push(addr);
            }
            if looks_like_ipv4(&peer.router_id) {
                ips.push(&peer.router_id);
            }

            let _guard = self.write_lock.lock().await;
            let mut tx = self.store.pool().begin().await?;
            let neighbor_id = NeighborRepo::upsert(&mut tx, device_id, &obs, Utc::now()).await?;
            let remote = self.resolve(&mut tx, device_id, &obs.remote_device_name, &ips).await?;
            NeighborRepo::set_remote_device(&mut tx, neighbor_id, remote).await?;
            tx.commit().await?;

            summary.neighbors += 1;
            if remote.is_some() {
                summary.resolved += 1;
            }
        }
        Ok(summary)
    }

    /// Create links for every resolved neighbor that has none yet.
    /// Existing links are left untouched, so repeated sweeps are no-ops.
    pub async fn auto_link_sweep(&self) -> Result<AutoLinkReport> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.store.pool().begin().await?;
        let now = Utc::now();
        let mut report = AutoLinkReport::default();

        for neighbor in NeighborRepo::list_resolved(&mut tx).await? {
            report.scanned += 1;
            let remote_id = match neighbor.remote_device_id {
                Some(id) if id != neighbor.device_id => id,
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };
            if !DeviceRepo::exists(&mut tx, remote_id).await? {
                report.skipped += 1;
                continue;
            }

            if LinkRepo::find_between(&mut tx, neighbor.device_id, remote_id).await?.is_some() {
                report.existing += 1;
                continue;
            }

            LinkRepo::create(
                &mut tx,
                &NewLink {
                    source_device_id: neighbor.device_id,
                    target_device_id: remote_id,
                    source_interface: Some(neighbor.local_interface.as_str()),
                    target_interface: neighbor.remote_interface.as_deref(),
                    link_type: link_type::DISCOVERED,
                    bandwidth: None,
                },
                now,
            )
            .await?;
            report.created += 1;
        }

        tx.commit().await.context("Failed to commit auto-link sweep")?;
        tracing::info!(
            "Auto-link sweep: {} scanned, {} created, {} existing, {} skipped",
            report.scanned,
            report.created,
            report.existing,
            report.skipped
        );
        Ok(report)
    }

    /// Resolve a reported neighbor to a registered device other than
    /// `device_id`: exact name, exact short name, substring (first-match
    /// policy only), then management address.
    async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        device_id: i64,
        reported_name: &str,
        ips: &[&str],
    ) -> Result<Option<i64>> {
        let name = reported_name.trim();
        let mut candidates: Vec<&str> = Vec::new();
        if !name.is_empty() {
            candidates.push(name);
            if !looks_like_ipv4(name) {
                if let Some((short, _)) = name.split_once('.') {
                    if !short.is_empty() {
                        candidates.push(short);
                    }
                }
            }
        }

        for candidate in &candidates {
            let ids = DeviceRepo::ids_by_exact_name(&mut *conn, candidate, device_id).await?;
            if let Some(id) = pick(&ids, "exact", candidate) {
                return Ok(Some(id));
            }
        }

        if self.policy == NeighborMatchPolicy::FirstMatch {
            // Dotted addresses only match whole, never as a fragment
            for candidate in candidates
                .iter()
                .filter(|c| c.len() >= MIN_FRAGMENT_LEN && !looks_like_ipv4(c))
            {
                let ids = DeviceRepo::ids_by_name_fragment(&mut *conn, candidate, device_id).await?;
                if let Some(id) = pick(&ids, "substring", candidate) {
                    return Ok(Some(id));
                }
            }
        }

        for ip in ips {
            let ids = DeviceRepo::ids_by_ip(&mut *conn, ip, device_id).await?;
            if let Some(id) = pick(&ids, "address", ip) {
                return Ok(Some(id));
            }
        }

        tracing::debug!("Neighbor '{}' of device {} is not a registered device", name, device_id);
        Ok(None)
    }
}

/// Lowest id wins; more than one candidate is logged
fn pick(ids: &[i64], stage: &str, value: &str) -> Option<i64> {
    let first = ids.first().copied()?;
    if ids.len() > 1 {
        tracing::warn!(
            "Ambiguous {} match for '{}': devices {:?}, using {}",
            stage,
            value,
            ids,
            first
        );
    }
    Some(first)
}

/// Create the link between `local` and `remote`, or refresh the one that
/// already exists in either direction
async fn ensure_link(
    conn: &mut SqliteConnection,
    local: i64,
    remote: i64,
    local_interface: Option<&str>,
    remote_interface: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LinkChange> {
    match LinkRepo::find_between(&mut *conn, local, remote).await? {
        Some(link) => {
            LinkRepo::refresh_side(&mut *conn, &link, local, local_interface, now).await?;
            LinkRepo::refresh_side(&mut *conn, &link, remote, remote_interface, now).await?;
            Ok(LinkChange::Refreshed)
        }
        None => {
            LinkRepo::create(
                &mut *conn,
                &NewLink {
                    source_device_id: local,
                    target_device_id: remote,
                    source_interface: local_interface,
                    target_interface: remote_interface,
                    link_type: link_type::DISCOVERED,
                    bandwidth: None,
                },
                now,
            )
            .await?;
            Ok(LinkChange::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{device, store};
    use std::time::Duration;

    fn lldp(local: &str, remote: &str, port: &str) -> NeighborRecord {
        let mut r = NeighborRecord::new(local, remote, &format!("{} {} {}", local, remote, port));
        r.remote_interface = Some(port.to_string());
        r
    }

    #[tokio::test]
    async fn test_upsert_keeps_discovered_at() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        engine.record_neighbors(core.id, &[lldp("GE0/0/1", "unknown-a", "GE0/0/24")]).await.unwrap();
        let first = store.list_neighbors(core.id).await.unwrap();
        assert_eq!(first.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.record_neighbors(core.id, &[lldp("GE0/0/1", "unknown-b", "GE0/0/23")]).await.unwrap();
        let second = store.list_neighbors(core.id).await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].discovered_at, first[0].discovered_at);
        assert!(second[0].last_updated > first[0].last_updated);
        assert_eq!(second[0].remote_device_name, "unknown-b");
        assert_eq!(second[0].remote_interface.as_deref(), Some("GE0/0/23"));
    }

    #[tokio::test]
    async fn test_fqdn_neighbor_resolves_and_creates_link() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let dist = device(&store, "SW-DIST-01", "10.0.0.2", "huawei").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let summary = engine
            .record_neighbors(core.id, &[lldp("GE0/0/1", "sw-dist-01.domain.local", "GE0/0/24")])
            .await
            .unwrap();
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.links_created, 1);

        let neighbors = store.list_neighbors(core.id).await.unwrap();
        assert_eq!(neighbors[0].remote_device_id, Some(dist.id));

        let links = store.list_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].connects(core.id, dist.id));
        assert_eq!(links[0].link_type, link_type::DISCOVERED);
        assert_eq!(links[0].status, link_status::UP);
        assert_eq!(links[0].interface_of(core.id), Some("GE0/0/1"));
        assert_eq!(links[0].interface_of(dist.id), Some("GE0/0/24"));
    }

    #[tokio::test]
    async fn test_unregistered_neighbor_without_ip_stays_unresolved() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        device(&store, "SW-DIST-01", "10.0.0.2", "huawei").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let summary = engine
            .record_neighbors(core.id, &[lldp("GE0/0/9", "printer-lobby", "eth0")])
            .await
            .unwrap();
        assert_eq!(summary.resolved, 0);

        let neighbors = store.list_neighbors(core.id).await.unwrap();
        assert_eq!(neighbors[0].remote_device_id, None);
        assert!(store.list_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inference_refreshes_reverse_manual_link() {
        let store = store().await;
        let a = device(&store, "leaf-a", "10.0.0.1", "arista").await;
        let b = device(&store, "leaf-b", "10.0.0.2", "arista").await;
        let manual = store
            .create_link(&CreateLinkRequest {
                source_device_id: b.id,
                target_device_id: a.id,
                source_interface: None,
                target_interface: None,
                link_type: link_type::MANUAL.to_string(),
                bandwidth: Some(100_000),
            })
            .await
            .unwrap();

        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);
        let summary = engine.record_neighbors(a.id, &[lldp("Et1", "leaf-b", "Et2")]).await.unwrap();
        assert_eq!(summary.links_created, 0);
        assert_eq!(summary.links_updated, 1);

        let links = store.list_links().await.unwrap();
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.id, manual.id);
        assert_eq!(link.source_device_id, b.id);
        assert_eq!(link.target_device_id, a.id);
        assert_eq!(link.link_type, link_type::MANUAL);
        assert_eq!(link.bandwidth, Some(100_000));
        assert_eq!(link.target_interface.as_deref(), Some("Et1"));
        assert_eq!(link.source_interface.as_deref(), Some("Et2"));
    }

    #[tokio::test]
    async fn test_both_ends_reporting_share_one_link() {
        let store = store().await;
        let a = device(&store, "sw-a", "10.0.0.1", "cisco").await;
        let b = device(&store, "sw-b", "10.0.0.2", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        engine.record_neighbors(a.id, &[lldp("Gi1/0/1", "sw-b", "Gi1/0/2")]).await.unwrap();
        engine.record_neighbors(b.id, &[lldp("Gi1/0/2", "sw-a", "Gi1/0/1")]).await.unwrap();

        let links = store.list_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source_device_id, a.id);
        assert_eq!(links[0].interface_of(b.id), Some("Gi1/0/2"));
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = store().await;
        let a = device(&store, "sw-a", "10.0.0.1", "cisco").await;
        let b = device(&store, "sw-b", "10.0.0.2", "cisco").await;
        let c = device(&store, "sw-c", "10.0.0.3", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        engine
            .record_neighbors(a.id, &[lldp("Gi1", "sw-b", "Gi1"), lldp("Gi2", "sw-c", "Gi1")])
            .await
            .unwrap();
        engine.record_neighbors(b.id, &[lldp("Gi1", "sw-a", "Gi1")]).await.unwrap();

        // Drop the a-c link, as after a bulk import
        let links = store.list_links().await.unwrap();
        let ac = links.iter().find(|l| l.connects(a.id, c.id)).unwrap();
        store.delete_link(ac.id).await.unwrap();

        let first = engine.auto_link_sweep().await.unwrap();
        assert_eq!(first.scanned, 3);
        assert_eq!(first.created, 1);
        assert_eq!(first.existing, 2);
        assert_eq!(first.skipped, 0);

        let before = store.list_links().await.unwrap();
        let second = engine.auto_link_sweep().await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 3);

        let after = store.list_links().await.unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(after.len(), 2);
        for (x, y) in before.iter().zip(&after) {
            assert_eq!((x.source_device_id, x.target_device_id), (y.source_device_id, y.target_device_id));
        }
    }

    #[tokio::test]
    async fn test_ip_fallback() {
        let store = store().await;
        let a = device(&store, "edge-1", "10.0.0.1", "juniper").await;
        let b = device(&store, "edge-2", "192.0.2.7", "juniper").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let mut record = lldp("ge-0/0/0", "00:11:22:33:44:55", "ge-0/0/1");
        record.remote_ip = Some("192.0.2.7".to_string());
        let summary = engine.record_neighbors(a.id, &[record]).await.unwrap();

        assert_eq!(summary.links_created, 1);
        assert_eq!(store.list_neighbors(a.id).await.unwrap()[0].remote_device_id, Some(b.id));
    }

    #[tokio::test]
    async fn test_exact_policy_skips_substring_stage() {
        let store = store().await;
        let a = device(&store, "core-1", "10.0.0.1", "cisco").await;
        let b = device(&store, "dc1-dist-01-rack4", "10.0.0.2", "cisco").await;

        let strict = LinkInference::new(store.clone(), NeighborMatchPolicy::Exact);
        let s = strict.record_neighbors(a.id, &[lldp("Gi1", "dist-01", "Gi1")]).await.unwrap();
        assert_eq!(s.resolved, 0);

        let loose = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);
        let s = loose.record_neighbors(a.id, &[lldp("Gi1", "dist-01", "Gi1")]).await.unwrap();
        assert_eq!(s.resolved, 1);
        assert_eq!(store.list_neighbors(a.id).await.unwrap()[0].remote_device_id, Some(b.id));
    }

    #[tokio::test]
    async fn test_ambiguous_substring_takes_lowest_id() {
        let store = store().await;
        let a = device(&store, "core", "10.0.0.1", "cisco").await;
        let first = device(&store, "access-01", "10.0.0.2", "cisco").await;
        device(&store, "access-010", "10.0.0.3", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        engine.record_neighbors(a.id, &[lldp("Gi1", "ccess-01", "Gi1")]).await.unwrap();
        assert_eq!(store.list_neighbors(a.id).await.unwrap()[0].remote_device_id, Some(first.id));
    }

    #[tokio::test]
    async fn test_neighbor_naming_itself_is_not_resolved() {
        let store = store().await;
        let a = device(&store, "loop-sw", "10.0.0.1", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let mut record = lldp("Gi1", "loop-sw", "Gi2");
        record.remote_ip = Some("10.0.0.1".to_string());
        let summary = engine.record_neighbors(a.id, &[record]).await.unwrap();
        assert_eq!(summary.resolved, 0);
        assert!(store.list_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ospf_peers_resolve_without_links() {
        let store = store().await;
        let a = device(&store, "r1", "10.255.0.1", "cisco").await;
        let b = device(&store, "r2", "10.255.0.2", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let peer = RoutingPeerRecord {
            router_id: "10.255.0.2".to_string(),
            address: Some("192.168.1.2".to_string()),
            interface: "Gi0/1".to_string(),
            state: "FULL/DR".to_string(),
            priority: Some(1),
            dead_time: Some(33),
            area: None,
            raw: "10.255.0.2 1 FULL/DR 00:00:33 192.168.1.2 Gi0/1".to_string(),
        };
        let summary = engine.record_routing_peers(a.id, &[peer]).await.unwrap();
        assert_eq!(summary.resolved, 1);

        let neighbors = store.list_neighbors(a.id).await.unwrap();
        assert_eq!(neighbors[0].protocol, Protocol::Ospf);
        assert_eq!(neighbors[0].remote_device_id, Some(b.id));
        assert_eq!(neighbors[0].remote_ip.as_deref(), Some("192.168.1.2"));
        assert!(store.list_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_router_id_is_not_matched_as_name_fragment() {
        let store = store().await;
        let a = device(&store, "r1", "10.0.0.1", "cisco").await;
        device(&store, "10.0.0.21", "10.9.9.21", "cisco").await;
        let b = device(&store, "r2", "10.0.0.2", "cisco").await;
        let engine = LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch);

        let peer = RoutingPeerRecord {
            router_id: "10.0.0.2".to_string(),
            address: None,
            interface: "Gi0/1".to_string(),
            state: "FULL/BDR".to_string(),
            priority: Some(1),
            dead_time: Some(35),
            area: None,
            raw: "10.0.0.2 1 FULL/BDR 00:00:35 - Gi0/1".to_string(),
        };
        engine.record_routing_peers(a.id, &[peer]).await.unwrap();

        let neighbors = store.list_neighbors(a.id).await.unwrap();
        assert_eq!(neighbors[0].remote_device_id, Some(b.id));
    }
}
