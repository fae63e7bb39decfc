//! Output formatting utilities for the CLI
//!
//! Tables for process snapshots and lookup results, batch transcripts, and
//! colored status messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use mctl_core::{ProcessRecord, ScrapedEntry};
use mctl_session::CommandReport;

/// Widest a table is allowed to wrap to
const TABLE_WIDTH: usize = 120;

/// Format a process snapshot as an ASCII table
///
/// Returns "No processes" if the snapshot is empty.
pub fn format_processes(records: &[ProcessRecord]) -> String {
    if records.is_empty() {
        return "No processes".to_string();
    }

    #[derive(Tabled)]
    struct ProcessRow {
        #[tabled(rename = "USER")]
        user: String,
        #[tabled(rename = "PID")]
        pid: u32,
        #[tabled(rename = "TIME")]
        metric: String,
        #[tabled(rename = "COMMAND")]
        command: String,
    }

    let rows: Vec<ProcessRow> = records
        .iter()
        .map(|r| ProcessRow {
            user: r.user.clone(),
            pid: r.pid,
            metric: r.metric.clone(),
            command: truncate(&r.command, 80),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(TABLE_WIDTH))
        .to_string()
}

/// Format scraped lookup rows as an ASCII table
pub fn format_entries(entries: &[ScrapedEntry]) -> String {
    if entries.is_empty() {
        return "No matches".to_string();
    }

    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "USER")]
        user: String,
        #[tabled(rename = "PID")]
        pid: u32,
        #[tabled(rename = "FILE")]
        label: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            user: e.user.clone(),
            pid: e.pid,
            label: e.label.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Join batch reports into one transcript
pub fn format_reports(reports: &[CommandReport]) -> String {
    reports
        .iter()
        .map(CommandReport::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Goes to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, pid: u32, command: &str) -> ProcessRecord {
        ProcessRecord {
            user: user.to_string(),
            pid,
            metric: "0:07".to_string(),
            command: command.to_string(),
        }
    }

    #[test]
    fn test_format_processes() {
        let table = format_processes(&[record("oper", 2201, "runcobol MENU01")]);
        assert!(table.contains("USER"));
        assert!(table.contains("2201"));
        assert!(table.contains("runcobol MENU01"));
        assert_eq!(format_processes(&[]), "No processes");
    }

    #[test]
    fn test_format_entries() {
        let table = format_entries(&[ScrapedEntry::new("prod", 2201, "/d/work/12345.pgm")]);
        assert!(table.contains("/d/work/12345.pgm"));
        assert_eq!(format_entries(&[]), "No matches");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ação longa demais", 8), "ação ...");
    }
}
