//! Text scraping for remote command and menu output
//!
//! Nothing in here fails on bad input: lines that do not have the expected
//! shape are skipped and logged at trace level.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PidListError;
use crate::types::{ProcessRecord, ScrapedEntry};

/// `<user> <pid> <label>` as printed by the remote menu's query screens
static RE_TRIPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+)\s+(\d+)\s+(\S.*)$").unwrap());

/// Number of whitespace-separated columns in a `ps aux` line
pub const PS_FIELD_COUNT: usize = 11;

/// Extract every `user pid label` line from captured menu output, in order.
///
/// PIDs are `u32` throughout, so a digits token too large for one is
/// treated like any other non-matching line and skipped.
pub fn extract_triples(text: &str) -> Vec<ScrapedEntry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some(caps) = RE_TRIPLE.captures(line) else {
            continue;
        };

        match caps[2].parse::<u32>() {
            Ok(pid) => entries.push(ScrapedEntry::new(&caps[1], pid, &caps[3])),
            Err(_) => tracing::trace!("Skipping line with out-of-range pid: {:?}", line),
        }
    }

    entries
}

/// Split `line` on whitespace into at most `max` fields.
///
/// The last field keeps its inner whitespace, like a command line would.
pub fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();

    while !rest.is_empty() && max > 0 {
        if fields.len() + 1 == max {
            fields.push(rest.trim_end());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Parse the stdout of the listing command into records.
///
/// The first line is the header. `metric_column` selects which field is
/// reported as the metric.
pub fn parse_process_listing(output: &str, metric_column: usize) -> Vec<ProcessRecord> {
    let mut records = Vec::new();

    for line in output.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_fields(line, PS_FIELD_COUNT);
        if fields.len() < PS_FIELD_COUNT {
            tracing::trace!("Skipping malformed process line: {:?}", line);
            continue;
        }

        let Ok(pid) = fields[1].parse::<u32>() else {
            tracing::trace!("Skipping process line with bad pid: {:?}", line);
            continue;
        };

        records.push(ProcessRecord {
            user: fields[0].to_string(),
            pid,
            metric: fields
                .get(metric_column)
                .map(|m| m.to_string())
                .unwrap_or_default(),
            command: fields[PS_FIELD_COUNT - 1].to_string(),
        });
    }

    records
}

/// Parse a user-entered PID list such as `"101, 102 103-104"`.
///
/// Commas, dashes and whitespace all separate PIDs.
pub fn parse_pid_list(input: &str) -> Result<Vec<u32>, PidListError> {
    let pids = input
        .split(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| PidListError::InvalidPid(part.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if pids.is_empty() {
        return Err(PidListError::Empty);
    }
    Ok(pids)
}
