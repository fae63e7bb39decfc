//! Recently used hosts

use std::path::{Path, PathBuf};

/// Newline-separated list of hosts the operator has connected to, oldest
/// first. The last entry is the most recent connection.
#[derive(Debug, Clone)]
pub struct HostHistory {
    path: PathBuf,
    hosts: Vec<String>,
}

impl HostHistory {
    /// Load the history; unreadable files are treated as empty. A host listed
    /// twice keeps its later position.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut hosts: Vec<String> = Vec::new();

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    hosts.retain(|h| h != line);
                    hosts.push(line.to_string());
                }
            }
            Err(e) => tracing::debug!("No host history at {:?}: {}", path, e),
        }

        Self { path, hosts }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The host connected to most recently
    pub fn last(&self) -> Option<&str> {
        self.hosts.last().map(String::as_str)
    }

    /// Move `host` to the end and rewrite the file. Write failures are
    /// ignored.
    pub fn record(&mut self, host: &str) {
        let host = host.trim();
        if host.is_empty() {
            return;
        }
        self.hosts.retain(|h| h != host);
        self.hosts.push(host.to_string());

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, self.hosts.join("\n")) {
            tracing::debug!("Failed to save host history to {:?}: {}", self.path, e);
        }
    }
}
