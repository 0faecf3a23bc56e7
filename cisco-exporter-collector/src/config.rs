use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use cisco_exporter_common::{Error, Result};

use crate::target::{DEFAULT_SSH_PORT, Target};

/// Collection pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Metric name prefix (default: "cisco").
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Devices to scrape, as `host`, `host:port` or `[v6]:port`.
    #[serde(default)]
    pub targets: Vec<String>,

    /// SSH settings shared by all targets.
    #[serde(default)]
    pub ssh: SshConfig,

    /// Feature collectors to run.
    #[serde(default)]
    pub features: FeaturesConfig,

    /// Maximum number of targets scraped at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a whole collection pass (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Report `up=1` for targets that connect but run an unknown OS.
    #[serde(default)]
    pub unsupported_dialect_up: bool,
}

fn default_namespace() -> String {
    "cisco".to_string()
}

fn default_max_concurrency() -> usize {
    16
}

fn default_request_timeout() -> u64 {
    55
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            targets: Vec::new(),
            ssh: SshConfig::default(),
            features: FeaturesConfig::default(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout(),
            unsupported_dialect_up: false,
        }
    }
}

/// SSH connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Login user.
    #[serde(default = "default_username")]
    pub username: String,

    /// Private key used for public key authentication.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Passphrase protecting `key_file`.
    #[serde(default)]
    pub key_passphrase: Option<String>,

    /// Password, used when no key file is configured.
    #[serde(default)]
    pub password: Option<String>,

    /// Port used for targets that do not specify one.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection and authentication timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single command (seconds).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Maximum number of output lines accepted per command.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Also offer CBC ciphers for older device firmware.
    #[serde(default)]
    pub legacy_ciphers: bool,
}

fn default_username() -> String {
    "cisco_exporter".to_string()
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_command_timeout() -> u64 {
    10
}

fn default_batch_size() -> usize {
    10_000
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            key_file: None,
            key_passphrase: None,
            password: None,
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
            batch_size: default_batch_size(),
            legacy_ciphers: false,
        }
    }
}

impl SshConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Per-feature enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_true")]
    pub bgp: bool,
    #[serde(default = "default_true")]
    pub environment: bool,
    #[serde(default = "default_true")]
    pub facts: bool,
    #[serde(default = "default_true")]
    pub interfaces: bool,
    #[serde(default = "default_true")]
    pub optics: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            bgp: true,
            environment: true,
            facts: true,
            interfaces: true,
            optics: true,
        }
    }
}

impl CollectorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the configured targets, dropping duplicates.
    pub fn parsed_targets(&self) -> Result<Vec<Target>> {
        let mut targets: Vec<Target> = Vec::with_capacity(self.targets.len());

        for raw in &self.targets {
            let target = Target::parse_with_port(raw, self.ssh.port)
                .map_err(|e| Error::Config(e.to_string()))?;

            if targets.iter().any(|t| t.id() == target.id()) {
                tracing::warn!(target = %target, "Duplicate target ignored");
                continue;
            }
            targets.push(target);
        }

        Ok(targets)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::Config("Metric namespace cannot be empty".to_string()));
        }
        if self.ssh.username.is_empty() {
            return Err(Error::Config("SSH username cannot be empty".to_string()));
        }
        if self.ssh.key_file.is_none() && self.ssh.password.is_none() {
            return Err(Error::Config(
                "Either ssh.key_file or ssh.password must be set".to_string(),
            ));
        }
        if self.ssh.batch_size == 0 {
            return Err(Error::Config("ssh.batch_size must be positive".to_string()));
        }
        if self.ssh.connect_timeout_secs == 0 || self.ssh.command_timeout_secs == 0 {
            return Err(Error::Config("SSH timeouts must be positive".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        self.parsed_targets()?;

        Ok(())
    }
}
