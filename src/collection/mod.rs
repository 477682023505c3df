//! Collection orchestrator.
//!
//! One collection runs one remote session against one device:
//!
//! `Idle -> SessionOpening -> Executing(op)... -> SessionClosing -> Completed | Failed`
//!
//! Commands run strictly in sequence with a short settling delay between
//! them. The per-device deadline bounds session open and command execution
//! only. The session is always closed, and outputs are only parsed and
//! persisted after that, so a fatal error or timeout mid-sequence leaves no
//! partial records behind.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::db::{NotFoundError, Store, ValidationError};
use crate::models::*;
use crate::parsers::{CommandCatalog, ParserRegistry};
use crate::ssh::{CommandSession, ConnectionError, SessionOpener, SessionTarget};
use crate::topology::LinkInference;

const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionPhase {
    Idle,
    SessionOpening,
    Executing(Operation),
    SessionClosing,
    Completed,
    Failed,
}

/// Timeouts, pacing and fallback credentials for the collector
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Pause between consecutive commands on one session
    pub command_delay: Duration,
    pub batch_workers: usize,
    /// Deadline for session open plus every command of one collection
    pub device_timeout: Duration,
    pub default_username: String,
    pub default_password: String,
}

impl CollectorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            command_timeout: cfg.command_timeout(),
            command_delay: cfg.command_delay(),
            batch_workers: cfg.batch_workers,
            device_timeout: cfg.device_timeout(),
            default_username: cfg.default_ssh_user.clone(),
            default_password: cfg.default_ssh_pass.clone(),
        }
    }
}

/// Output of the execute phase, before anything is parsed
struct Execution {
    outputs: Vec<(Operation, String)>,
    operation_errors: Vec<OperationError>,
    fatal: Option<ConnectionError>,
}

/// Collector drives collections against devices and hands the parsed
/// records to the store and the inference engine
pub struct Collector {
    store: Store,
    registry: ParserRegistry,
    catalog: CommandCatalog,
    opener: Arc<dyn SessionOpener>,
    inference: Arc<LinkInference>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        store: Store,
        registry: ParserRegistry,
        catalog: CommandCatalog,
        opener: Arc<dyn SessionOpener>,
        inference: Arc<LinkInference>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            store,
            registry,
            catalog,
            opener,
            inference,
            settings,
        }
    }

    /// Run `operations` against one device. A connection failure is
    /// reported as an unsuccessful outcome; only storage failures and
    /// unknown devices are returned as errors.
    pub async fn collect(&self, device_id: i64, operations: &[Operation]) -> Result<CollectionOutcome> {
        let device = self
            .store
            .get_device(device_id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", &device_id.to_string()))?;

        let ops = dedupe(operations);
        if ops.is_empty() {
            return Err(ValidationError("No operations requested".to_string()).into());
        }

        let attempt_id = uuid::Uuid::new_v4().to_string();
        self.store.create_attempt(&attempt_id, device.id, &ops).await?;
        self.store.update_attempt_started(&attempt_id).await?;
        tracing::info!(
            "Collecting {:?} from device {} ({}) [attempt {}]",
            ops.iter().map(|o| o.as_str()).collect::<Vec<_>>(),
            device.id,
            device.ip,
            attempt_id
        );

        self.run_attempt(&attempt_id, &device, &ops).await
    }

    /// Collect from several devices on a bounded worker pool. Results keep
    /// the input order; one device failing never affects the others.
    pub async fn collect_batch(&self, device_ids: &[i64], operations: &[Operation]) -> Vec<BatchItem> {
        let workers = self.settings.batch_workers.max(1);
        stream::iter(device_ids.iter().copied())
            .map(|device_id| async move {
                match self.collect(device_id, operations).await {
                    Ok(outcome) => BatchItem {
                        device_id,
                        success: outcome.success,
                        error: (!outcome.success).then(|| outcome.message.clone()),
                        outcome: Some(outcome),
                    },
                    Err(e) => {
                        tracing::warn!("Batch collection for device {} failed: {:#}", device_id, e);
                        BatchItem {
                            device_id,
                            success: false,
                            outcome: None,
                            error: Some(format!("{:#}", e)),
                        }
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await
    }

    /// Open a session, run the vendor's test command, close. Nothing is
    /// written to the store.
    pub async fn test_connection(&self, device_id: i64) -> Result<ConnectionTest> {
        let device = self
            .store
            .get_device(device_id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", &device_id.to_string()))?;
        let target = self.target_for(&device).await?;
        let command = self
            .catalog
            .command_for(&self.registry, device.vendor, Operation::TestConnection);

        let started = Instant::now();
        let result = match self.opener.open(&target).await {
            Ok(mut session) => {
                let out = session.run(&command).await;
                session.close().await;
                out
            }
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        Ok(match result {
            Ok(output) => ConnectionTest {
                device_id,
                success: true,
                output: Some(output),
                error: None,
                elapsed_ms,
            },
            Err(e) => {
                tracing::info!("Connection test for device {} failed: {}", device_id, e);
                ConnectionTest {
                    device_id,
                    success: false,
                    output: None,
                    error: Some(e.to_string()),
                    elapsed_ms,
                }
            }
        })
    }

    async fn run_attempt(&self, attempt_id: &str, device: &Device, ops: &[Operation]) -> Result<CollectionOutcome> {
        let mut phase = CollectionPhase::Idle;
        let target = self.target_for(device).await?;
        let deadline = tokio::time::Instant::now() + self.settings.device_timeout;

        advance(&mut phase, CollectionPhase::SessionOpening, device.id);
        let opened = tokio::time::timeout_at(deadline, self.opener.open(&target))
            .await
            .unwrap_or_else(|_| Err(self.deadline_exceeded()));
        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                advance(&mut phase, CollectionPhase::Failed, device.id);
                let message = e.to_string();
                self.fail_attempt(attempt_id, device, &message).await?;
                return Ok(failed_outcome(attempt_id, device.id, message));
            }
        };

        let execution = self
            .execute(session.as_mut(), device, ops, deadline, &mut phase)
            .await;

        advance(&mut phase, CollectionPhase::SessionClosing, device.id);
        session.close().await;

        if let Some(e) = execution.fatal {
            advance(&mut phase, CollectionPhase::Failed, device.id);
            let message = e.to_string();
            self.fail_attempt(attempt_id, device, &message).await?;
            return Ok(failed_outcome(attempt_id, device.id, message));
        }

        let parsed = self.parse(device.vendor, &execution.outputs);
        let summary = match self.persist(device.id, &parsed).await {
            Ok(summary) => summary,
            Err(e) => {
                advance(&mut phase, CollectionPhase::Failed, device.id);
                let message = format!("{:#}", e);
                if let Err(inner) = self.store.update_attempt_failed(attempt_id, &message).await {
                    tracing::error!("Failed to record failure of attempt {}: {}", attempt_id, inner);
                }
                return Err(e);
            }
        };

        let raw_output: serde_json::Map<String, serde_json::Value> = execution
            .outputs
            .iter()
            .map(|(op, out)| (op.as_str().to_string(), serde_json::Value::String(out.clone())))
            .collect();
        let parsed_value = serde_json::to_value(&parsed).context("Failed to serialize parsed records")?;
        self.store
            .update_attempt_completed(attempt_id, &serde_json::Value::Object(raw_output), &parsed_value)
            .await?;
        self.store.mark_device_online(device.id).await?;
        advance(&mut phase, CollectionPhase::Completed, device.id);

        let message = format!(
            "Collected {} neighbors, {} OSPF peers, {} interfaces",
            parsed.neighbors.len(),
            parsed.routing_peers.len(),
            parsed.interfaces.len()
        );
        tracing::info!("Device {}: {}", device.id, message);

        Ok(CollectionOutcome {
            attempt_id: attempt_id.to_string(),
            device_id: device.id,
            success: true,
            message,
            result: parsed,
            operation_errors: execution.operation_errors,
            links_created: summary.links_created,
            links_updated: summary.links_updated,
        })
    }

    async fn execute(
        &self,
        session: &mut dyn CommandSession,
        device: &Device,
        ops: &[Operation],
        deadline: tokio::time::Instant,
        phase: &mut CollectionPhase,
    ) -> Execution {
        let mut execution = Execution {
            outputs: Vec::with_capacity(ops.len()),
            operation_errors: Vec::new(),
            fatal: None,
        };

        for (i, op) in ops.iter().enumerate() {
            if i > 0 && !self.settings.command_delay.is_zero() {
                tokio::time::sleep(self.settings.command_delay).await;
            }
            advance(phase, CollectionPhase::Executing(*op), device.id);

            let command = self.catalog.command_for(&self.registry, device.vendor, *op);
            let result = tokio::time::timeout_at(deadline, session.run(&command))
                .await
                .unwrap_or_else(|_| Err(self.deadline_exceeded()));
            match result {
                Ok(output) => execution.outputs.push((*op, output)),
                Err(e) if !e.is_fatal() => {
                    tracing::warn!("Device {}: '{}' failed: {}", device.id, command, e);
                    execution.operation_errors.push(OperationError {
                        operation: *op,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Device {}: aborting on {} error: {}", device.id, e.kind(), e);
                    execution.fatal = Some(e);
                    break;
                }
            }
        }
        execution
    }

    fn parse(&self, vendor: Vendor, outputs: &[(Operation, String)]) -> ParsedCollection {
        let parser = self.registry.get(vendor);
        let mut parsed = ParsedCollection::default();
        for (op, raw) in outputs {
            match op {
                Operation::GetNeighbors => parsed.neighbors = parser.parse_neighbors(raw),
                Operation::GetOspfPeers => parsed.routing_peers = parser.parse_routing_peers(raw),
                Operation::GetInterfaces => parsed.interfaces = parser.parse_interfaces(raw),
                Operation::GetSystemInfo => parsed.system_info = Some(parser.parse_system_info(raw)),
                Operation::TestConnection => {}
            }
        }
        parsed
    }

    async fn persist(&self, device_id: i64, parsed: &ParsedCollection) -> Result<InferenceSummary> {
        let mut summary = InferenceSummary::default();
        if !parsed.neighbors.is_empty() {
            summary = self.inference.record_neighbors(device_id, &parsed.neighbors).await?;
        }
        if !parsed.routing_peers.is_empty() {
            self.inference
                .record_routing_peers(device_id, &parsed.routing_peers)
                .await?;
        }
        if !parsed.interfaces.is_empty() {
            self.store.upsert_interfaces(device_id, &parsed.interfaces).await?;
        }
        if let Some(info) = parsed.system_info.as_ref().filter(|i| !i.is_empty()) {
            self.store.update_device_identity(device_id, info).await?;
        }
        Ok(summary)
    }

    fn deadline_exceeded(&self) -> ConnectionError {
        ConnectionError::Timeout(format!(
            "collection exceeded {:?}",
            self.settings.device_timeout
        ))
    }

    async fn fail_attempt(&self, attempt_id: &str, device: &Device, message: &str) -> Result<()> {
        tracing::warn!("Collection from device {} ({}) failed: {}", device.id, device.ip, message);
        self.store.update_attempt_failed(attempt_id, message).await?;
        self.store.update_device_error(device.id, message).await?;
        Ok(())
    }

    /// Login details: the device's credential if it has one, else the
    /// configured defaults
    async fn target_for(&self, device: &Device) -> Result<SessionTarget> {
        let mut username = self.settings.default_username.clone();
        let mut password = self.settings.default_password.clone();
        if let Some(cred_id) = device.credential_id {
            match self.store.get_credential(cred_id).await? {
                Some(cred) => {
                    username = cred.username;
                    password = cred.password;
                }
                None => tracing::warn!(
                    "Device {} references missing credential {}, using defaults",
                    device.id,
                    cred_id
                ),
            }
        }

        Ok(SessionTarget {
            host: device.ip.clone(),
            port: u16::try_from(device.ssh_port)
                .ok()
                .filter(|p| *p != 0)
                .unwrap_or(DEFAULT_SSH_PORT),
            username,
            password,
            connect_timeout: self.settings.connect_timeout,
            command_timeout: self.settings.command_timeout,
        })
    }
}

fn advance(phase: &mut CollectionPhase, next: CollectionPhase, device_id: i64) {
    tracing::debug!("Device {}: {:?} -> {:?}", device_id, phase, next);
    *phase = next;
}

/// Keep the first occurrence of each operation, in caller order
fn dedupe(operations: &[Operation]) -> Vec<Operation> {
    let mut ops: Vec<Operation> = Vec::with_capacity(operations.len());
    for op in operations {
        if !ops.contains(op) {
            ops.push(*op);
        }
    }
    ops
}

fn failed_outcome(attempt_id: &str, device_id: i64, message: String) -> CollectionOutcome {
    CollectionOutcome {
        attempt_id: attempt_id.to_string(),
        device_id,
        success: false,
        message,
        result: ParsedCollection::default(),
        operation_errors: Vec::new(),
        links_created: 0,
        links_updated: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeighborMatchPolicy;
    use crate::db::test_support::{device, store};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const LLDP: &str = "\
<SW-CORE-01>display lldp neighbor brief
Local Intf       Neighbor Dev             Neighbor Intf             Exptime(s)
GE0/0/1          sw-dist-01.corp.local    GE0/0/24                  120
GE0/0/2          PRINTER-3F               eth0                      120
";

    const VERSION: &str = "\
<SW-CORE-01>display version
VRP (R) software, Version 5.170 (S5720 V200R011C10SPC500)
HUAWEI S5720-28X-SI-AC Routing Switch uptime is 1 day, 2 hours, 3 minutes
ESN of slot 0: 2102351931DMK3000123
";

    const INTERFACES: &str = "\
Interface                   PHY   Protocol InUti OutUti   inErrors  outErrors
GigabitEthernet0/0/1        up    up          0%     0%          0          0
GigabitEthernet0/0/2        *down down        0%     0%          0          0
";

    /// Opener that replays canned command output and records every command
    #[derive(Default)]
    struct ScriptedOpener {
        outputs: HashMap<String, Result<String, ConnectionError>>,
        refuse: HashMap<String, ConnectionError>,
        /// Command that never returns
        hang: Option<String>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedOpener {
        fn reply(mut self, command: &str, output: &str) -> Self {
            self.outputs.insert(command.to_string(), Ok(output.to_string()));
            self
        }

        fn fail(mut self, command: &str, err: ConnectionError) -> Self {
            self.outputs.insert(command.to_string(), Err(err));
            self
        }

        fn refuse(mut self, host: &str, err: ConnectionError) -> Self {
            self.refuse.insert(host.to_string(), err);
            self
        }

        fn hang_on(mut self, command: &str) -> Self {
            self.hang = Some(command.to_string());
            self
        }

        fn commands(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct ScriptedSession {
        outputs: HashMap<String, Result<String, ConnectionError>>,
        hang: Option<String>,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SessionOpener for ScriptedOpener {
        async fn open(&self, target: &SessionTarget) -> Result<Box<dyn CommandSession>, ConnectionError> {
            if let Some(err) = self.refuse.get(&target.host) {
                return Err(err.clone());
            }
            self.log.lock().unwrap().push(format!("open {}@{}:{}", target.username, target.host, target.port));
            Ok(Box::new(ScriptedSession {
                outputs: self.outputs.clone(),
                hang: self.hang.clone(),
                log: self.log.clone(),
            }))
        }
    }

    #[async_trait]
    impl CommandSession for ScriptedSession {
        async fn run(&mut self, command: &str) -> Result<String, ConnectionError> {
            self.log.lock().unwrap().push(command.to_string());
            if self.hang.as_deref() == Some(command) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.outputs.get(command).cloned().unwrap_or_else(|| Ok(String::new()))
        }

        async fn close(&mut self) {
            self.log.lock().unwrap().push("close".to_string());
        }
    }

    fn settings() -> CollectorSettings {
        CollectorSettings {
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            command_delay: Duration::ZERO,
            batch_workers: 2,
            device_timeout: Duration::from_secs(30),
            default_username: "admin".to_string(),
            default_password: "secret".to_string(),
        }
    }

    fn collector(store: &Store, opener: Arc<ScriptedOpener>) -> Collector {
        collector_with(store, opener, settings())
    }

    fn collector_with(store: &Store, opener: Arc<ScriptedOpener>, settings: CollectorSettings) -> Collector {
        let registry = ParserRegistry::with_defaults();
        let catalog = CommandCatalog::from_registry(&registry);
        let inference = Arc::new(LinkInference::new(store.clone(), NeighborMatchPolicy::FirstMatch));
        Collector::new(store.clone(), registry, catalog, opener, inference, settings)
    }

    #[tokio::test]
    async fn test_session_open_failure_marks_device_error() {
        let store = store().await;
        let dev = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let opener = Arc::new(
            ScriptedOpener::default().refuse("10.0.0.1", ConnectionError::Authentication("bad password".to_string())),
        );
        let collector = collector(&store, opener.clone());

        let outcome = collector.collect(dev.id, &Operation::DISCOVERY).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Authentication failed"));
        assert!(opener.commands().is_empty());

        let attempt = store.get_attempt(&outcome.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status, collection_status::FAILED);
        assert_eq!(attempt.error.as_deref(), Some(outcome.message.as_str()));

        let dev = store.get_device(dev.id).await.unwrap().unwrap();
        assert_eq!(dev.status, device_status::ERROR);
        assert_eq!(dev.last_error.as_deref(), Some(outcome.message.as_str()));
    }

    #[tokio::test]
    async fn test_full_collection_persists_everything() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let dist = device(&store, "SW-DIST-01", "10.0.0.2", "huawei").await;
        let opener = Arc::new(
            ScriptedOpener::default()
                .reply("display lldp neighbor brief", LLDP)
                .reply("display version", VERSION)
                .reply("display interface brief", INTERFACES),
        );
        let collector = collector(&store, opener.clone());

        let outcome = collector.collect(core.id, &Operation::DISCOVERY).await.unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.result.neighbors.len(), 2);
        assert_eq!(outcome.result.interfaces.len(), 2);
        assert!(outcome.result.routing_peers.is_empty());
        assert_eq!(outcome.links_created, 1);

        assert_eq!(
            opener.commands(),
            vec![
                "open admin@10.0.0.1:22",
                "display version",
                "display interface brief",
                "display lldp neighbor brief",
                "display ospf peer brief",
                "close",
            ]
        );

        let links = store.list_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].connects(core.id, dist.id));

        let neighbors = store.list_neighbors(core.id).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(store.list_interfaces(core.id).await.unwrap().len(), 2);

        let core = store.get_device(core.id).await.unwrap().unwrap();
        assert_eq!(core.status, device_status::ONLINE);
        assert_eq!(core.model.as_deref(), Some("S5720-28X-SI-AC"));
        assert_eq!(core.serial_number.as_deref(), Some("2102351931DMK3000123"));
        assert!(core.last_seen.is_some());

        let attempt = store.get_attempt(&outcome.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status, collection_status::COMPLETED);
        let raw = attempt.raw_output.unwrap();
        assert_eq!(raw["get-neighbors"].as_str(), Some(LLDP));
        assert_eq!(raw["get-ospf-peers"].as_str(), Some(""));
        assert_eq!(attempt.parsed_result.unwrap()["neighbors"].as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn test_rejected_command_does_not_abort() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let opener = Arc::new(
            ScriptedOpener::default()
                .fail(
                    "display lldp neighbor brief",
                    ConnectionError::Command("LLDP is not enabled".to_string()),
                )
                .reply("display interface brief", INTERFACES),
        );
        let collector = collector(&store, opener.clone());

        let ops = [Operation::GetNeighbors, Operation::GetInterfaces];
        let outcome = collector.collect(core.id, &ops).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.operation_errors.len(), 1);
        assert_eq!(outcome.operation_errors[0].operation, Operation::GetNeighbors);
        assert_eq!(outcome.result.interfaces.len(), 2);
        assert_eq!(store.list_interfaces(core.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_mid_sequence_persists_nothing() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let opener = Arc::new(
            ScriptedOpener::default()
                .reply("display interface brief", INTERFACES)
                .fail("display version", ConnectionError::Timeout("no output".to_string())),
        );
        let collector = collector(&store, opener.clone());

        let ops = [Operation::GetInterfaces, Operation::GetSystemInfo, Operation::GetNeighbors];
        let outcome = collector.collect(core.id, &ops).await.unwrap();
        assert!(!outcome.success);
        assert!(store.list_interfaces(core.id).await.unwrap().is_empty());

        // The session is still closed and later operations never run
        let commands = opener.commands();
        assert_eq!(commands.last().map(String::as_str), Some("close"));
        assert!(!commands.iter().any(|c| c == "display lldp neighbor brief"));

        let core = store.get_device(core.id).await.unwrap().unwrap();
        assert_eq!(core.status, device_status::ERROR);
    }

    #[tokio::test]
    async fn test_device_timeout_closes_session_and_persists_nothing() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        let opener = Arc::new(
            ScriptedOpener::default()
                .reply("display interface brief", INTERFACES)
                .hang_on("display version"),
        );
        let collector = collector_with(
            &store,
            opener.clone(),
            CollectorSettings {
                device_timeout: Duration::from_millis(200),
                ..settings()
            },
        );

        let ops = [Operation::GetInterfaces, Operation::GetSystemInfo, Operation::GetNeighbors];
        let outcome = collector.collect(core.id, &ops).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Timed out: collection exceeded 200ms");

        assert_eq!(
            opener.commands(),
            vec![
                "open admin@10.0.0.1:22",
                "display interface brief",
                "display version",
                "close",
            ]
        );
        assert!(store.list_interfaces(core.id).await.unwrap().is_empty());

        let attempt = store.get_attempt(&outcome.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status, collection_status::FAILED);
        let core = store.get_device(core.id).await.unwrap().unwrap();
        assert_eq!(core.status, device_status::ERROR);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_and_fails_attempt() {
        let store = store().await;
        let core = device(&store, "SW-CORE-01", "10.0.0.1", "huawei").await;
        sqlx::query("DROP TABLE device_interfaces")
            .execute(store.pool())
            .await
            .unwrap();
        let opener = Arc::new(ScriptedOpener::default().reply("display interface brief", INTERFACES));
        let collector = collector(&store, opener.clone());

        let result = collector.collect(core.id, &[Operation::GetInterfaces]).await;
        assert!(result.is_err());
        assert_eq!(opener.commands().last().map(String::as_str), Some("close"));

        let attempts = store.list_attempts(core.id, 10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, collection_status::FAILED);
        assert!(attempts[0].error.is_some());
    }

    #[tokio::test]
    async fn test_cisco_neighbors_create_link() {
        let store = store().await;
        let access = device(&store, "sw-access-01", "10.0.0.1", "cisco").await;
        let dist = device(&store, "SW-DIST-01", "10.0.0.2", "cisco").await;
        let opener = Arc::new(ScriptedOpener::default().reply(
            "show lldp neighbors",
            "\
Device ID           Local Intf     Hold-time  Capability      Port ID
SW-DIST-01          Gi1/0/1        120        B,R             Gi1/0/24
ap-floor3           Gi1/0/10       120                        a4b1.c2d3.e4f5

Total entries displayed: 2
",
        ));
        let collector = collector(&store, opener);

        let outcome = collector.collect(access.id, &[Operation::GetNeighbors]).await.unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.links_created, 1);

        let links = store.list_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].connects(access.id, dist.id));

        let neighbors = store.list_neighbors(access.id).await.unwrap();
        let uplink = neighbors.iter().find(|n| n.local_interface == "Gi1/0/1").unwrap();
        assert_eq!(uplink.remote_device_name, "SW-DIST-01");
        assert_eq!(uplink.remote_device_id, Some(dist.id));
    }

    #[tokio::test]
    async fn test_operations_are_deduplicated_in_caller_order() {
        let store = store().await;
        let core = device(&store, "r1", "10.0.0.1", "cisco").await;
        let opener = Arc::new(ScriptedOpener::default());
        let collector = collector(&store, opener.clone());

        let ops = [
            Operation::GetNeighbors,
            Operation::GetSystemInfo,
            Operation::GetNeighbors,
            Operation::TestConnection,
        ];
        let outcome = collector.collect(core.id, &ops).await.unwrap();
        assert!(outcome.success);
        assert_eq!(
            opener.commands(),
            vec!["open admin@10.0.0.1:22", "show lldp neighbors", "show version", "show clock", "close"]
        );

        let attempt = store.get_attempt(&outcome.attempt_id).await.unwrap().unwrap();
        assert_eq!(
            attempt.operations,
            vec![Operation::GetNeighbors, Operation::GetSystemInfo, Operation::TestConnection]
        );
    }

    #[tokio::test]
    async fn test_device_credential_and_port_are_used() {
        let store = store().await;
        let cred = store
            .create_credential(&CreateCredentialRequest {
                name: "lab".to_string(),
                description: None,
                username: "netops".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        let dev = store
            .create_device(&CreateDeviceRequest {
                name: "edge".to_string(),
                hostname: String::new(),
                ip: "192.0.2.1".to_string(),
                vendor: "juniper".to_string(),
                ssh_port: Some(2222),
                credential_id: Some(cred.id),
            })
            .await
            .unwrap();
        let opener = Arc::new(ScriptedOpener::default());
        let collector = collector(&store, opener.clone());

        collector.collect(dev.id, &[Operation::GetInterfaces]).await.unwrap();
        assert_eq!(opener.commands()[0], "open netops@192.0.2.1:2222");
        assert_eq!(opener.commands()[1], "show interfaces terse");
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_keeps_order() {
        let store = store().await;
        let a = device(&store, "a", "10.0.0.1", "cisco").await;
        let b = device(&store, "b", "10.0.0.2", "cisco").await;
        let c = device(&store, "c", "10.0.0.3", "cisco").await;
        let opener = Arc::new(
            ScriptedOpener::default().refuse("10.0.0.2", ConnectionError::Unreachable("no route".to_string())),
        );
        let collector = collector(&store, opener);

        let ids = [a.id, b.id, 9999, c.id];
        let items = collector.collect_batch(&ids, &[Operation::GetSystemInfo]).await;
        assert_eq!(items.iter().map(|i| i.device_id).collect::<Vec<_>>(), ids.to_vec());
        assert_eq!(items.iter().map(|i| i.success).collect::<Vec<_>>(), vec![true, false, false, true]);
        assert!(items[1].error.as_deref().unwrap_or_default().contains("no route"));
        assert!(items[2].outcome.is_none());

        assert_eq!(store.get_device(a.id).await.unwrap().unwrap().status, device_status::ONLINE);
        assert_eq!(store.get_device(b.id).await.unwrap().unwrap().status, device_status::ERROR);
    }

    #[tokio::test]
    async fn test_connection_test_writes_nothing() {
        let store = store().await;
        let dev = device(&store, "r1", "10.0.0.1", "cisco").await;
        let opener = Arc::new(ScriptedOpener::default().reply("show clock", "*10:00:00.000 UTC Mon Jan 1 2024"));
        let collector = collector(&store, opener.clone());

        let test = collector.test_connection(dev.id).await.unwrap();
        assert!(test.success);
        assert_eq!(test.output.as_deref(), Some("*10:00:00.000 UTC Mon Jan 1 2024"));
        assert!(store.list_attempts(dev.id, 10).await.unwrap().is_empty());
        assert_eq!(store.get_device(dev.id).await.unwrap().unwrap().status, device_status::UNKNOWN);

        let missing = collector.test_connection(4242).await.unwrap_err();
        assert!(missing.downcast_ref::<NotFoundError>().is_some());
    }

    #[tokio::test]
    async fn test_empty_operation_list_is_rejected() {
        let store = store().await;
        let dev = device(&store, "r1", "10.0.0.1", "cisco").await;
        let collector = collector(&store, Arc::new(ScriptedOpener::default()));

        let err = collector.collect(dev.id, &[]).await.unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
        tokio_test::assert_ok!(store.list_attempts(dev.id, 10).await);
    }
}
