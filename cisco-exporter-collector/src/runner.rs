//! Single command execution with time and size bounds.

use std::time::{Duration, Instant};

use crate::config::SshConfig;
use crate::error::CommandError;
use crate::session::Session;

/// Markers devices print when they refuse a command.
const REJECTION_MARKERS: &[&str] = &[
    "% Invalid input detected",
    "% Invalid command",
    "% Incomplete command",
    "% Ambiguous command",
    "% Unknown command",
    "Syntax error while parsing",
];

/// Output of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub command: String,
    pub text: String,
    pub elapsed: Duration,
    /// Output exceeded the line limit and was cut.
    pub truncated: bool,
}

/// Runs commands with a per-command timeout and line limit.
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    timeout: Duration,
    max_lines: usize,
}

impl CommandRunner {
    pub fn new(timeout: Duration, max_lines: usize) -> Self {
        Self { timeout, max_lines }
    }

    pub fn from_config(ssh: &SshConfig) -> Self {
        Self::new(ssh.command_timeout(), ssh.batch_size)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Run `command` on `session`.
    pub async fn run(
        &self,
        session: &mut Session,
        command: &str,
    ) -> Result<CommandOutput, CommandError> {
        let start = Instant::now();

        let raw = tokio::time::timeout(self.timeout, session.exec(command, self.max_lines))
            .await
            .map_err(|_| CommandError::Timeout {
                command: command.to_string(),
                timeout: self.timeout,
            })??;

        if let Some(line) = rejection_line(&raw) {
            return Err(CommandError::Rejected {
                command: command.to_string(),
                message: line.to_string(),
            });
        }

        let (text, truncated) = truncate_lines(raw, self.max_lines);
        if truncated {
            tracing::debug!(
                command = %command,
                max_lines = self.max_lines,
                "Command output truncated"
            );
        }

        Ok(CommandOutput {
            command: command.to_string(),
            text,
            elapsed: start.elapsed(),
            truncated,
        })
    }
}

fn rejection_line(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| REJECTION_MARKERS.iter().any(|m| line.starts_with(m)))
}

/// Keep at most `max_lines` lines of `text`.
pub fn truncate_lines(text: String, max_lines: usize) -> (String, bool) {
    match text.match_indices('\n').nth(max_lines.saturating_sub(1)) {
        Some((idx, _)) if max_lines > 0 && idx + 1 < text.len() => {
            let mut text = text;
            text.truncate(idx + 1);
            (text, true)
        }
        _ if max_lines == 0 && !text.is_empty() => (String::new(), true),
        _ => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockDevice};
    use crate::target::Target;

    async fn open(device: MockDevice) -> Session {
        let connector = MockConnector::new().with_device("r1", device);
        let target: Target = "r1".parse().unwrap();
        Session::open(&connector, &target, Duration::from_secs(1))
            .await
            .unwrap()
    }

    #[test]
    fn test_truncate_lines() {
        let (text, truncated) = truncate_lines("a\nb\nc\n".to_string(), 2);
        assert_eq!(text, "a\nb\n");
        assert!(truncated);

        let (text, truncated) = truncate_lines("a\nb\n".to_string(), 2);
        assert_eq!(text, "a\nb\n");
        assert!(!truncated);

        let (text, truncated) = truncate_lines("a\nb".to_string(), 2);
        assert_eq!(text, "a\nb");
        assert!(!truncated);

        let (text, truncated) = truncate_lines("a\nb\nc".to_string(), 2);
        assert_eq!(text, "a\nb\n");
        assert!(truncated);

        let (text, truncated) = truncate_lines("a".to_string(), 0);
        assert_eq!(text, "");
        assert!(truncated);
    }

    #[tokio::test]
    async fn test_run_ok() {
        let mut session = open(MockDevice::ios().with_command("show clock", "12:00:00.000 UTC\n")).await;
        let runner = CommandRunner::new(Duration::from_secs(1), 100);

        let output = tokio_test::assert_ok!(runner.run(&mut session, "show clock").await);
        assert_eq!(output.text, "12:00:00.000 UTC\n");
        assert!(!output.truncated);
        session.close().await;
    }

    #[tokio::test]
    async fn test_run_rejected() {
        let mut session = open(MockDevice::ios()).await;
        let runner = CommandRunner::new(Duration::from_secs(1), 100);

        let err = tokio_test::assert_err!(runner.run(&mut session, "show bogus").await);
        assert!(matches!(err, CommandError::Rejected { .. }));
        session.close().await;
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let mut session = open(
            MockDevice::ios()
                .with_command("show tech-support", "...")
                .with_command_delay("show tech-support", Duration::from_secs(5)),
        )
        .await;
        let runner = CommandRunner::new(Duration::from_millis(20), 100);

        let err = runner.run(&mut session, "show tech-support").await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
        session.close().await;
    }

    #[tokio::test]
    async fn test_run_truncates() {
        let mut session = open(MockDevice::ios().with_command("show log", "1\n2\n3\n4\n")).await;
        let runner = CommandRunner::new(Duration::from_secs(1), 2);

        let output = runner.run(&mut session, "show log").await.unwrap();
        assert_eq!(output.text, "1\n2\n");
        assert!(output.truncated);
        session.close().await;
    }
}
