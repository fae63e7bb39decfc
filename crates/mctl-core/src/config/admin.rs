//! Administrator configuration
//!
//! Holds the admin/master passwords, the update URL and the permanent
//! process filter. The passwords and URL are only carried for the
//! presentation layer; nothing in the core checks them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::filter::{FilterRule, PermanentFilter};

const DEFAULT_ADMIN_PASSWORD: &str = "admin";
const DEFAULT_MASTER_PASSWORD: &str = "master";
const DEFAULT_UPDATE_URL: &str = "https://example.invalid/menuctl/version.json";

/// Persisted administrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub admin_password: String,
    pub master_password: String,
    pub update_url: String,

    /// Users whose processes are never listed
    pub blocked_users: Vec<String>,

    /// Command substrings whose processes are never listed
    pub blocked_commands: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            master_password: DEFAULT_MASTER_PASSWORD.to_string(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            blocked_users: vec![],
            blocked_commands: vec![],
        }
    }
}

impl AdminConfig {
    /// Load from `path`, falling back to the built-in defaults when the file
    /// is missing or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match super::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default admin config ({})", e);
                Self::default()
            }
        }
    }

    /// Build the permanent filter from the blocked lists.
    ///
    /// Blank entries are dropped and the rest are trimmed.
    pub fn permanent_filter(&self) -> PermanentFilter {
        let users = self
            .blocked_users
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(FilterRule::user_block);
        let commands = self
            .blocked_commands
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(FilterRule::command_block);

        PermanentFilter::new(users.chain(commands).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AdminConfig::load_or_default(Path::new("/nonexistent/admin.toml"));
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.admin_password, "admin");
    }

    #[test]
    fn test_unparseable_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();

        let config = AdminConfig::load_or_default(file.path());
        assert_eq!(config, AdminConfig::default());
    }

    #[test]
    fn test_permanent_filter_skips_blank_entries() {
        let config = AdminConfig {
            blocked_users: vec!["root".into(), "  ".into(), " daemon ".into()],
            blocked_commands: vec!["".into(), "sshd".into()],
            ..Default::default()
        };

        let filter = config.permanent_filter();
        assert_eq!(filter.rules().len(), 3);
        assert_eq!(filter.rules()[1], FilterRule::user_block("daemon"));
    }
}
