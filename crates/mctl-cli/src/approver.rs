//! Host key approval at the terminal

use std::io::{BufRead, Write};

use async_trait::async_trait;

use mctl_session::{ApprovalDecision, ApprovalRequest, HostKeyApprover};

use crate::output::print_warning;

/// Asks the operator on stdin whether to trust an unknown host key
#[derive(Debug, Default)]
pub struct TerminalApprover;

#[async_trait]
impl HostKeyApprover for TerminalApprover {
    async fn decide(&self, request: ApprovalRequest) -> ApprovalDecision {
        let answer = tokio::task::spawn_blocking(move || prompt(&request)).await;

        match answer {
            Ok(Ok(line)) => parse_answer(&line),
            Ok(Err(e)) => {
                tracing::warn!("Could not read host key answer: {}", e);
                ApprovalDecision::Reject
            }
            Err(e) => {
                tracing::warn!("Host key prompt failed: {}", e);
                ApprovalDecision::Reject
            }
        }
    }
}

fn prompt(request: &ApprovalRequest) -> std::io::Result<String> {
    print_warning(&format!(
        "The authenticity of host '{}' (port {}) can't be established.",
        request.host, request.port
    ));
    println!(
        "{} key fingerprint is SHA256:{}",
        request.key_type, request.fingerprint
    );
    print!("Trust this host? [y]es and remember / [o]nce / [N]o: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Map a typed answer to a decision; anything unrecognised rejects
pub fn parse_answer(answer: &str) -> ApprovalDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Accept { remember: true },
        "o" | "once" => ApprovalDecision::Accept { remember: false },
        _ => ApprovalDecision::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(
            parse_answer("Y\n"),
            ApprovalDecision::Accept { remember: true }
        );
        assert_eq!(
            parse_answer(" once "),
            ApprovalDecision::Accept { remember: false }
        );
        assert_eq!(parse_answer(""), ApprovalDecision::Reject);
        assert_eq!(parse_answer("sure"), ApprovalDecision::Reject);
    }
}
