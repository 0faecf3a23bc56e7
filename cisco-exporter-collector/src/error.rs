//! Error taxonomy for the collection pipeline.
//!
//! Connection and resolution errors fail a whole target. Command and parse
//! errors fail a single command or entity and are never propagated past the
//! feature collector that hit them.

use std::time::Duration;

use thiserror::Error;

/// Failure to establish a session with a target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// TCP connection could not be established.
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The device rejected the configured credentials.
    #[error("Authentication failed for user '{0}'")]
    AuthFailed(String),

    /// SSH negotiation failed (no common cipher, protocol error, ...).
    #[error("SSH handshake failed: {0}")]
    Handshake(String),

    /// Connection setup did not complete in time.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials could not be loaded locally.
    #[error("Invalid credentials: {0}")]
    Credentials(String),
}

/// Failure of a single command on an open session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The device does not understand the command.
    #[error("Command '{command}' rejected by device: {message}")]
    Rejected { command: String, message: String },

    /// The command did not complete within its timeout.
    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The channel failed while running the command.
    #[error("Channel error while running '{command}': {message}")]
    Channel { command: String, message: String },

    /// The session was already closed.
    #[error("Session is closed")]
    Closed,
}

impl CommandError {
    /// Create a channel error.
    pub fn channel(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Failure to determine which OS dialect a target runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// No signature matched the identification output.
    #[error("Unrecognized OS signature (first line: '{0}')")]
    Unrecognized(String),

    /// The identification command itself failed.
    #[error("Identification command failed: {0}")]
    Command(#[from] CommandError),
}

/// Structurally broken command output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Output ends in the middle of a record.
    #[error("Output truncated inside record '{0}'")]
    Truncated(String),

    /// A table header was found but its layout is not understood.
    #[error("Unrecognized table header: '{0}'")]
    Header(String),

    /// A field that must be numeric is not.
    #[error("Invalid value '{value}' for field '{field}'")]
    Value { field: &'static str, value: String },
}

/// Failure that makes an entire feature meaningless for one target.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Metric emission failed: {0}")]
    Metric(#[from] cisco_exporter_common::Error),
}
