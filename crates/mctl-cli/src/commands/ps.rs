//! Process listing command

use anyhow::Result;

use crate::commands::Remote;
use crate::output::{format_processes, print_info};

/// List remote processes, narrowed by the optional filters
pub async fn ps_command(
    remote: &mut Remote,
    user: Option<&str>,
    pid: Option<&str>,
    command: Option<&str>,
) -> Result<()> {
    remote.console.refresh_inventory().await?;
    let visible = remote.console.apply_volatile_filter(user, pid, command);

    println!("{}", format_processes(&visible));
    print_info(&format!(
        "{} of {} processes shown",
        visible.len(),
        remote.console.snapshot().len()
    ));
    Ok(())
}
