//! Scripted workflows for the remote admin menu
//!
//! The menu prints nothing that can be recognised as a prompt, so every
//! workflow is a fixed list of lines, each followed by a fixed wait.

use std::time::Duration;

use mctl_core::config::MenuTimings;
use mctl_core::parser::extract_triples;
use mctl_core::{LookupKind, ScrapedEntry};

use crate::error::WorkflowError;
use crate::interactive::InteractiveSession;

/// Menu option that kills processes by PID
const MENU_KILL: &str = "3";
/// Menu option that searches a directory by pattern
const MENU_LOOKUP: &str = "2";

/// One line sent to the menu and the wait after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub line: String,
    pub delay: Duration,
}

impl Step {
    fn new(line: impl Into<String>, delay: Duration) -> Self {
        Self {
            line: line.into(),
            delay,
        }
    }
}

/// Steps of the kill workflow
pub fn kill_steps(pids: &[u32], timings: &MenuTimings) -> Result<Vec<Step>, WorkflowError> {
    if pids.is_empty() {
        return Err(WorkflowError::EmptyPidList);
    }

    let joined = pids
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    Ok(vec![
        Step::new(MENU_KILL, timings.kill_step),
        Step::new(joined, timings.kill_step),
        Step::new("", timings.kill_step),
    ])
}

/// Steps of a lookup workflow, not counting the final settle
pub fn lookup_steps(
    kind: LookupKind,
    query: &str,
    base_path: &str,
    timings: &MenuTimings,
) -> Vec<Step> {
    let query = query.trim();
    let pattern = match kind {
        LookupKind::ById => query,
        LookupKind::ByScreen if query.is_empty() => "*",
        LookupKind::ByScreen => query,
    };

    vec![
        Step::new(MENU_LOOKUP, timings.lookup_step),
        Step::new(base_path, timings.lookup_step),
        Step::new(format!("*{}", pattern), timings.lookup_step),
        Step::new("", timings.lookup_step),
    ]
}

/// Runs workflows over one interactive session
pub struct MenuAutomation<'a> {
    session: &'a InteractiveSession,
    timings: MenuTimings,
}

impl<'a> MenuAutomation<'a> {
    pub fn new(session: &'a InteractiveSession, timings: MenuTimings) -> Self {
        Self { session, timings }
    }

    /// Kill `pids` through the menu. Nothing is sent for an empty list.
    pub async fn kill_pids(&self, pids: &[u32]) -> Result<(), WorkflowError> {
        let steps = kill_steps(pids, &self.timings)?;
        tracing::info!("Killing PIDs {:?}", pids);
        self.run_steps(&steps).await
    }

    /// Search `base_path` for files named after `id`
    pub async fn lookup_by_id(
        &self,
        id: &str,
        base_path: &str,
    ) -> Result<Vec<ScrapedEntry>, WorkflowError> {
        self.lookup(LookupKind::ById, id, base_path).await
    }

    /// Search `base_path` for screens matching `pattern`
    pub async fn lookup_by_screen(
        &self,
        pattern: &str,
        base_path: &str,
    ) -> Result<Vec<ScrapedEntry>, WorkflowError> {
        self.lookup(LookupKind::ByScreen, pattern, base_path).await
    }

    pub async fn lookup(
        &self,
        kind: LookupKind,
        query: &str,
        base_path: &str,
    ) -> Result<Vec<ScrapedEntry>, WorkflowError> {
        let steps = lookup_steps(kind, query, base_path, &self.timings);
        tracing::info!("Looking up by {} '{}' in {}", kind, query.trim(), base_path);

        let window = self.session.open_capture()?;
        self.run_steps(&steps).await?;
        window.settle(self.timings.lookup_settle).await;

        let captured = window.close();
        if captured.end_of_stream {
            return Err(WorkflowError::Disconnected(
                "remote shell ended during lookup".to_string(),
            ));
        }

        let entries = extract_triples(&captured.text);
        tracing::debug!("Lookup matched {} entries", entries.len());
        Ok(entries)
    }

    async fn run_steps(&self, steps: &[Step]) -> Result<(), WorkflowError> {
        for step in steps {
            tracing::debug!("menu <- {:?}", step.line);
            self.session.send(&step.line).await?;

            tokio::select! {
                _ = tokio::time::sleep(step.delay) => {}
                _ = self.session.closed() => {}
            }

            if self.session.is_closed() {
                return Err(WorkflowError::Disconnected(
                    "remote shell ended".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.line.as_str()).collect()
    }

    #[test]
    fn test_kill_steps() {
        let timings = MenuTimings::default();
        let steps = kill_steps(&[101, 202], &timings).unwrap();
        assert_eq!(lines(&steps), vec!["3", "101 202", ""]);
        assert!(steps.iter().all(|s| s.delay == timings.kill_step));
    }

    #[test]
    fn test_kill_steps_reject_empty() {
        assert!(matches!(
            kill_steps(&[], &MenuTimings::default()),
            Err(WorkflowError::EmptyPidList)
        ));
    }

    #[test]
    fn test_lookup_by_id_steps() {
        let timings = MenuTimings::default();
        let steps = lookup_steps(LookupKind::ById, "12345", "/d/work", &timings);
        assert_eq!(lines(&steps), vec!["2", "/d/work", "*12345", ""]);

        let steps = lookup_steps(LookupKind::ById, "", "/d/work", &timings);
        assert_eq!(steps[2].line, "*");
    }

    #[test]
    fn test_lookup_by_screen_defaults_pattern() {
        let timings = MenuTimings::default();
        let steps = lookup_steps(LookupKind::ByScreen, "  ", "/d/dados", &timings);
        assert_eq!(lines(&steps), vec!["2", "/d/dados", "**", ""]);

        let steps = lookup_steps(LookupKind::ByScreen, "CAD01", "/d/dados", &timings);
        assert_eq!(steps[2].line, "*CAD01");
    }
}
