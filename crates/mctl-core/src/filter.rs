//! Process inventory filters
//!
//! The permanent filter comes from the admin configuration and is applied to
//! every snapshot before anyone sees it. The volatile filter is whatever the
//! operator typed into the search boxes and is layered on top.

use serde::{Deserialize, Serialize};

use crate::types::ProcessRecord;

/// What a block rule is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    UserBlock,
    CommandBlock,
}

/// A single permanent block rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub kind: FilterKind,
    pub pattern: String,
}

impl FilterRule {
    pub fn user_block(pattern: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::UserBlock,
            pattern: pattern.into(),
        }
    }

    pub fn command_block(pattern: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::CommandBlock,
            pattern: pattern.into(),
        }
    }

    /// Check whether this rule hides `record`
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        match self.kind {
            FilterKind::UserBlock => user_matches(&record.user, &self.pattern),
            FilterKind::CommandBlock => record
                .command
                .to_lowercase()
                .contains(&self.pattern.to_lowercase()),
        }
    }
}

/// Case-insensitive equality, also accepting one trailing `+`.
///
/// Some remote systems truncate long user names in `ps` output and mark the
/// cut with a `+`, so `oracle+` is treated as the user `oracle`.
fn user_matches(user: &str, pattern: &str) -> bool {
    let user = user.to_lowercase();
    let pattern = pattern.to_lowercase();

    match user.strip_suffix('+') {
        Some(stripped) if stripped == pattern => true,
        _ => user == pattern,
    }
}

/// Administrator-configured block rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermanentFilter {
    rules: Vec<FilterRule>,
}

impl PermanentFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Whether any rule hides `record`
    pub fn blocks(&self, record: &ProcessRecord) -> bool {
        self.rules.iter().any(|rule| rule.matches(record))
    }

    /// Drop every blocked record, keeping source order
    pub fn apply(&self, records: Vec<ProcessRecord>) -> Vec<ProcessRecord> {
        records.into_iter().filter(|r| !self.blocks(r)).collect()
    }
}

/// Session-only search predicates
///
/// Empty (or whitespace-only) fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatileFilter {
    pub user: Option<String>,
    pub pid: Option<String>,
    pub command: Option<String>,
}

impl VolatileFilter {
    pub fn new(user: Option<&str>, pid: Option<&str>, command: Option<&str>) -> Self {
        Self {
            user: normalize(user).map(|u| u.to_lowercase()),
            pid: normalize(pid),
            command: normalize(command).map(|c| c.to_lowercase()),
        }
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.pid.is_none() && self.command.is_none()
    }

    /// Forget all predicates
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check a single record against all predicates
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        let user_ok = self
            .user
            .as_deref()
            .map_or(true, |u| record.user.to_lowercase().contains(u));
        let pid_ok = self
            .pid
            .as_deref()
            .map_or(true, |p| record.pid.to_string().contains(p));
        let cmd_ok = self
            .command
            .as_deref()
            .map_or(true, |c| record.command.to_lowercase().contains(c));

        user_ok && pid_ok && cmd_ok
    }

    /// Filter a snapshot without touching it
    pub fn apply(&self, snapshot: &[ProcessRecord]) -> Vec<ProcessRecord> {
        snapshot
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Apply volatile predicates on top of an already permanently-filtered
/// snapshot.
pub fn volatile_filter(
    snapshot: &[ProcessRecord],
    user: Option<&str>,
    pid: Option<&str>,
    command: Option<&str>,
) -> Vec<ProcessRecord> {
    VolatileFilter::new(user, pid, command).apply(snapshot)
}
