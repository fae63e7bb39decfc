//! Running a list of one-shot commands

use std::fmt::Write as _;
use std::time::Duration;

use crate::error::ChannelError;
use crate::transport::{CommandExecutor, ExecOutput};

/// Outcome of one command in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub command: String,
    pub output: ExecOutput,
}

impl CommandReport {
    /// Transcript form: command, stdout, stderr and a non-zero exit status,
    /// skipping the empty parts
    pub fn render(&self) -> String {
        let mut out = format!("$ {}\n", self.command);

        let stdout = self.output.stdout.trim_end();
        if !stdout.is_empty() {
            let _ = writeln!(out, "{}", stdout);
        }

        let stderr = self.output.stderr.trim_end();
        if !stderr.is_empty() {
            let _ = writeln!(out, "ERROR: {}", stderr);
        }

        if let Some(code) = self.output.exit_code.filter(|&code| code != 0) {
            let _ = writeln!(out, "exit status: {}", code);
        }
        out
    }
}

/// Run every non-blank command in order. The first transport error aborts
/// the batch.
pub async fn run_batch<E, S>(
    executor: &E,
    commands: &[S],
    timeout: Duration,
) -> Result<Vec<CommandReport>, ChannelError>
where
    E: CommandExecutor + ?Sized,
    S: AsRef<str>,
{
    let mut reports = Vec::new();

    for command in commands.iter().map(|c| c.as_ref().trim()) {
        if command.is_empty() {
            continue;
        }
        let output = executor.exec(command, timeout).await?;
        reports.push(CommandReport {
            command: command.to_string(),
            output,
        });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl CommandExecutor for Recorder {
        async fn exec(
            &self,
            command: &str,
            _timeout: Duration,
        ) -> Result<ExecOutput, ChannelError> {
            self.seen.lock().unwrap().push(command.to_string());
            if self.fail_on == Some(command) {
                return Err(ChannelError::Closed);
            }
            Ok(ExecOutput {
                stdout: format!("ran {}\n", command),
                stderr: String::new(),
                exit_code: Some(0),
            })
        }
    }

    #[tokio::test]
    async fn test_blank_commands_skipped() {
        let recorder = Recorder::default();
        let reports = run_batch(&recorder, &["uptime", "  ", "", " df -h "], Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["uptime", "df -h"]);
        assert_eq!(reports[1].command, "df -h");
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let recorder = Recorder {
            fail_on: Some("second"),
            ..Default::default()
        };
        let result = run_batch(
            &recorder,
            &["first", "second", "third"],
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(ChannelError::Closed)));
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_render() {
        let report = CommandReport {
            command: "ls /nope".to_string(),
            output: ExecOutput {
                stdout: String::new(),
                stderr: "ls: cannot access '/nope'\n".to_string(),
                exit_code: Some(2),
            },
        };
        assert_eq!(
            report.render(),
            "$ ls /nope\nERROR: ls: cannot access '/nope'\nexit status: 2\n"
        );

        let report = CommandReport {
            command: "uptime".to_string(),
            output: ExecOutput {
                stdout: "up 3 days\n".to_string(),
                stderr: String::new(),
                exit_code: None,
            },
        };
        assert_eq!(report.render(), "$ uptime\nup 3 days\n");
    }

    #[test]
    fn test_render_omits_zero_exit_status() {
        let report = CommandReport {
            command: "true".to_string(),
            output: ExecOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: Some(0),
            },
        };
        assert_eq!(report.render(), "$ true\n");
    }
}
