use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::models::{Operation, Vendor};

use super::ParserRegistry;

const OPERATIONS: [Operation; 5] = [
    Operation::GetNeighbors,
    Operation::GetOspfPeers,
    Operation::GetInterfaces,
    Operation::GetSystemInfo,
    Operation::TestConnection,
];

/// CommandCatalog maps (vendor, operation) to the literal CLI command.
///
/// Defaults come from the registered parsers; a JSON override file can
/// replace individual entries:
/// `{"huawei": {"get-neighbors": "display lldp neighbor brief"}}`
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: HashMap<(Vendor, Operation), String>,
}

impl CommandCatalog {
    /// Catalog of every registered parser's default commands
    pub fn from_registry(registry: &ParserRegistry) -> Self {
        let mut commands = HashMap::new();
        for vendor in registry.vendors() {
            let parser = registry.get(vendor);
            for op in OPERATIONS {
                commands.insert((vendor, op), parser.default_command(op).to_string());
            }
        }
        Self { commands }
    }

    /// Apply overrides from a JSON document. Unknown vendors and
    /// operations are skipped with a warning. Returns how many entries
    /// were applied.
    pub fn apply_overrides(&mut self, json: &str) -> Result<usize> {
        let doc: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(json).context("Invalid command catalog JSON")?;

        let mut applied = 0;
        for (vendor_tag, ops) in doc {
            let vendor = Vendor::from_tag(&vendor_tag);
            if vendor == Vendor::Other {
                tracing::warn!("Command catalog: unknown vendor '{}'", vendor_tag);
                continue;
            }
            for (op_name, command) in ops {
                match Operation::parse(&op_name) {
                    Some(op) if !command.trim().is_empty() => {
                        self.commands.insert((vendor, op), command.trim().to_string());
                        applied += 1;
                    }
                    Some(_) => tracing::warn!("Command catalog: empty command for {}/{}", vendor, op_name),
                    None => tracing::warn!("Command catalog: unknown operation '{}'", op_name),
                }
            }
        }
        Ok(applied)
    }

    /// Load overrides from a file; a missing or malformed file leaves the
    /// defaults untouched
    pub async fn load_overrides(&mut self, path: &str) {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match self.apply_overrides(&content) {
                Ok(n) => tracing::info!("Loaded {} command overrides from {}", n, path),
                Err(e) => tracing::warn!("Ignoring command catalog {}: {:#}", path, e),
            },
            Err(e) => tracing::warn!("Could not read command catalog {}: {}", path, e),
        }
    }

    /// Command for a vendor/operation. Vendors without an entry use the
    /// registry fallback's command.
    pub fn command_for(&self, registry: &ParserRegistry, vendor: Vendor, op: Operation) -> String {
        self.commands
            .get(&(vendor, op))
            .cloned()
            .unwrap_or_else(|| registry.get(vendor).default_command(op).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_vendor_dialect() {
        let registry = ParserRegistry::with_defaults();
        let catalog = CommandCatalog::from_registry(&registry);
        assert_eq!(
            catalog.command_for(&registry, Vendor::Huawei, Operation::GetNeighbors),
            "display lldp neighbor brief"
        );
        assert_eq!(
            catalog.command_for(&registry, Vendor::Cisco, Operation::GetOspfPeers),
            "show ip ospf neighbor"
        );
        assert_eq!(
            catalog.command_for(&registry, Vendor::Juniper, Operation::GetInterfaces),
            "show interfaces terse"
        );
    }

    #[test]
    fn test_unknown_vendor_uses_fallback_command() {
        let registry = ParserRegistry::with_defaults();
        let catalog = CommandCatalog::from_registry(&registry);
        assert_eq!(
            catalog.command_for(&registry, Vendor::Other, Operation::GetSystemInfo),
            "show version"
        );
    }

    #[test]
    fn test_overrides_replace_single_entries() {
        let registry = ParserRegistry::with_defaults();
        let mut catalog = CommandCatalog::from_registry(&registry);
        let applied = catalog
            .apply_overrides(
                r#"{"huawei": {"get-interfaces": "display interface brief main", "bogus-op": "x"},
                    "mikrotik": {"get-neighbors": "/ip neighbor print"}}"#,
            )
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(
            catalog.command_for(&registry, Vendor::Huawei, Operation::GetInterfaces),
            "display interface brief main"
        );
        assert_eq!(
            catalog.command_for(&registry, Vendor::Huawei, Operation::GetNeighbors),
            "display lldp neighbor brief"
        );
    }

    #[test]
    fn test_malformed_overrides_are_rejected() {
        let registry = ParserRegistry::with_defaults();
        let mut catalog = CommandCatalog::from_registry(&registry);
        assert!(catalog.apply_overrides("not json").is_err());
    }
}
