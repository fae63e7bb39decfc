//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for connecting to and driving a remote host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// known_hosts file used by the trust store
    pub known_hosts_path: PathBuf,

    /// Port used when none is given on the command line
    pub default_port: u16,

    /// Bound on TCP connect and on password authentication
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Bound on each one-shot command
    #[serde(with = "duration_secs")]
    pub exec_timeout: Duration,

    /// Process listing settings
    pub inventory: InventoryConfig,

    /// Remote menu settings
    pub menu: MenuConfig,

    /// Capacity of the client event queue
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            known_hosts_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("known_hosts"),
            default_port: 22,
            connect_timeout: Duration::from_secs(10),
            exec_timeout: Duration::from_secs(30),
            inventory: InventoryConfig::default(),
            menu: MenuConfig::default(),
            event_capacity: 256,
        }
    }
}

/// How the remote process table is listed and parsed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Listing command, expected to print `ps aux` style columns
    pub command: String,

    /// Zero-based column copied into `ProcessRecord::metric`
    pub metric_column: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            command: "ps aux".to_string(),
            metric_column: 9,
        }
    }
}

/// Remote menu paths and delays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Base directory for lookups by id
    pub work_path: String,

    /// Base directory for lookups by screen
    pub data_path: String,

    /// Settle delays between scripted keystrokes
    pub timings: MenuTimings,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            work_path: "/d/work".to_string(),
            data_path: "/d/dados".to_string(),
            timings: MenuTimings::default(),
        }
    }
}

/// Fixed delays used while scripting the remote menu.
///
/// The menu prints no prompt that can be detected reliably, so each step
/// simply waits. These are defaults observed to work, not guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuTimings {
    /// Wait after each line of the kill workflow
    #[serde(with = "duration_millis")]
    pub kill_step: Duration,

    /// Wait after each line of a lookup workflow
    #[serde(with = "duration_millis")]
    pub lookup_step: Duration,

    /// Extra wait before a lookup's capture window closes
    #[serde(with = "duration_millis")]
    pub lookup_settle: Duration,

    /// Wait between sending `exit` and closing the shell
    #[serde(with = "duration_millis")]
    pub exit_grace: Duration,
}

impl Default for MenuTimings {
    fn default() -> Self {
        Self {
            kill_step: Duration::from_millis(500),
            lookup_step: Duration::from_secs(1),
            lookup_settle: Duration::from_secs(2),
            exit_grace: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            default_port = 2222

            [menu.timings]
            lookup_settle = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.default_port, 2222);
        assert_eq!(config.menu.timings.lookup_settle, Duration::from_secs(3));
        assert_eq!(config.menu.timings.kill_step, Duration::from_millis(500));
        assert_eq!(config.inventory.command, "ps aux");
        assert_eq!(config.menu.data_path, "/d/dados");
    }
}
