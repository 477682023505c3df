use std::env;
use std::time::Duration;

/// How a reported neighbor name is matched against registered devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborMatchPolicy {
    /// Exact, then domain-stripped exact, then substring; lowest device id wins
    FirstMatch,
    /// Exact and domain-stripped exact only
    Exact,
}

impl NeighborMatchPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "first-match" | "first_match" | "substring" => Some(Self::FirstMatch),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }
}

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub ssh_connect_timeout_secs: u64,
    pub ssh_command_timeout_secs: u64,
    pub command_delay_ms: u64,
    pub batch_workers: usize,
    pub device_timeout_secs: u64,
    pub default_ssh_user: String,
    pub default_ssh_pass: String,
    pub neighbor_match: NeighborMatchPolicy,
    pub command_catalog_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        let neighbor_match = get_env("NEIGHBOR_MATCH", "first-match");
        Self {
            db_path: get_env("DB_PATH", "/data/linkmap.db"),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            ssh_connect_timeout_secs: parse_env("SSH_CONNECT_TIMEOUT_SECS", 15),
            ssh_command_timeout_secs: parse_env("SSH_COMMAND_TIMEOUT_SECS", 30),
            command_delay_ms: parse_env("COMMAND_DELAY_MS", 500),
            batch_workers: parse_env::<usize>("BATCH_WORKERS", 4).max(1),
            device_timeout_secs: parse_env("DEVICE_TIMEOUT_SECS", 300),
            default_ssh_user: get_env("DEFAULT_SSH_USER", "admin"),
            default_ssh_pass: get_env("DEFAULT_SSH_PASS", ""),
            neighbor_match: NeighborMatchPolicy::parse(&neighbor_match).unwrap_or_else(|| {
                tracing::warn!("Unknown NEIGHBOR_MATCH '{}', using first-match", neighbor_match);
                NeighborMatchPolicy::FirstMatch
            }),
            command_catalog_path: env::var("COMMAND_CATALOG_PATH").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_command_timeout_secs)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_match_policy_parse() {
        assert_eq!(NeighborMatchPolicy::parse("exact"), Some(NeighborMatchPolicy::Exact));
        assert_eq!(NeighborMatchPolicy::parse("First-Match"), Some(NeighborMatchPolicy::FirstMatch));
        assert_eq!(NeighborMatchPolicy::parse("fuzzy"), None);
    }
}
