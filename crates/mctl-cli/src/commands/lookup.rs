//! Lookup commands

use anyhow::Result;

use mctl_core::LookupKind;

use crate::commands::Remote;
use crate::output::{format_entries, print_info};

/// Run a lookup through the remote menu and print the scraped rows
pub async fn lookup_command(remote: &mut Remote, kind: LookupKind, query: &str) -> Result<()> {
    remote.console.open_interactive().await?;
    let report = remote.console.run_lookup(kind, query).await?;

    println!("{}", format_entries(&report.entries));
    print_info(&format!("{} match(es)", report.entries.len()));
    Ok(())
}
