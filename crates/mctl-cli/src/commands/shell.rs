//! Line-mode interactive shell

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use mctl_core::SessionState;

use crate::commands::Remote;
use crate::output::print_info;

/// Forward stdin lines to the remote shell until `exit`, `quit` or EOF
pub async fn shell_command(remote: &mut Remote) -> Result<()> {
    remote.console.open_interactive().await?;
    print_info("Interactive shell started. Type 'exit' or 'quit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        remote.console.send_line(&line).await?;
        if remote.console.state() != SessionState::InteractiveActive {
            break;
        }
    }

    Ok(())
}
