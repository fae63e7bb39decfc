//! Kill command implementation

use anyhow::{Context, Result};

use mctl_core::parser::parse_pid_list;

use crate::commands::Remote;
use crate::output::{print_success, print_warning};

/// Kill processes through the remote menu
pub async fn kill_command(remote: &mut Remote, pids: &[String], force: bool) -> Result<()> {
    let pids = parse_pid_list(&pids.join(" ")).context("Invalid PID list")?;

    if !force {
        print_warning(&format!(
            "About to kill {} process(es): {:?}. Use --force to skip confirmation.",
            pids.len(),
            pids
        ));

        print!("Continue? [y/N] ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            print_warning("Aborted");
            return Ok(());
        }
    }

    remote.console.open_interactive().await?;
    remote.console.run_kill(&pids).await?;

    print_success(&format!("Sent kill for {:?}", pids));
    Ok(())
}
