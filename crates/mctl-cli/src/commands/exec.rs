//! Batch exec command

use anyhow::Result;

use crate::commands::Remote;
use crate::output::format_reports;

/// Run each command on its own channel and print the transcript
pub async fn exec_command(remote: &mut Remote, commands: &[String]) -> Result<()> {
    let reports = remote.console.run_batch(commands).await?;
    print!("{}", format_reports(&reports));
    Ok(())
}
