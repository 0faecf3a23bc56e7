//! Scrape targets.

use std::fmt;
use std::str::FromStr;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// A device to scrape, as configured.
///
/// The configured identifier (e.g. `"core-sw01"` or `"10.0.0.1:2222"`) is kept
/// verbatim and used as the `target` label so series identity follows the
/// configuration rather than name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    id: String,
    host: String,
    port: u16,
}

impl Target {
    /// Create a target from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let id = if port == DEFAULT_SSH_PORT {
            host.clone()
        } else if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        Self { id, host, port }
    }

    /// Parse a target identifier, falling back to `default_port`.
    ///
    /// Accepts `host`, `host:port`, `[v6]:port` and bare IPv6 addresses.
    pub fn parse_with_port(s: &str, default_port: u16) -> Result<Self, TargetParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| TargetParseError::Invalid(s.to_string()))?;
            match tail.strip_prefix(':') {
                Some(port) => (host, parse_port(s, port)?),
                None if tail.is_empty() => (host, default_port),
                None => return Err(TargetParseError::Invalid(s.to_string())),
            }
        } else if s.matches(':').count() == 1 {
            let (host, port) = s.split_once(':').unwrap_or((s, ""));
            (host, parse_port(s, port)?)
        } else {
            (s, default_port)
        };

        if host.is_empty() {
            return Err(TargetParseError::Invalid(s.to_string()));
        }

        Ok(Self {
            id: s.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Identifier used as the `target` label.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

fn parse_port(target: &str, port: &str) -> Result<u16, TargetParseError> {
    port.parse()
        .map_err(|_| TargetParseError::InvalidPort(target.to_string()))
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_port(s, DEFAULT_SSH_PORT)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Invalid target identifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TargetParseError {
    #[error("Target identifier is empty")]
    Empty,
    #[error("Invalid target '{0}'")]
    Invalid(String),
    #[error("Invalid port in target '{0}'")]
    InvalidPort(String),
}
