//! Authenticated command sessions.
//!
//! A [`Session`] is opened fresh for every collection pass and closed when the
//! pass ends. Transport is abstracted behind [`Connector`] / [`Shell`] so the
//! pipeline can be driven by the SSH implementation ([`SshConnector`]) or by a
//! scripted device in tests.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect, Preferred, cipher};
use russh_keys::key;

use crate::config::SshConfig;
use crate::error::{CommandError, ConnectionError};
use crate::target::Target;

/// Opens shells on targets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and authenticate. Must not retry.
    async fn connect(&self, target: &Target) -> Result<Box<dyn Shell>, ConnectionError>;
}

/// An authenticated channel able to run one command at a time.
#[async_trait]
pub trait Shell: Send {
    /// Run `command` and return its raw output.
    ///
    /// Implementations may stop reading once more than `max_lines` lines have
    /// been received.
    async fn exec(&mut self, command: &str, max_lines: usize) -> Result<String, CommandError>;

    /// Tear down the connection.
    async fn close(&mut self);
}

/// A live session bound to one target for the duration of one pass.
pub struct Session {
    target: String,
    shell: Option<Box<dyn Shell>>,
}

impl Session {
    /// Open a session, failing fast if `connect_timeout` elapses.
    pub async fn open(
        connector: &dyn Connector,
        target: &Target,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let shell = tokio::time::timeout(connect_timeout, connector.connect(target))
            .await
            .map_err(|_| ConnectionError::Timeout(connect_timeout))??;

        tracing::debug!(target = %target, "Session opened");

        Ok(Self {
            target: target.id().to_string(),
            shell: Some(shell),
        })
    }

    /// Run a command on the underlying shell.
    pub async fn exec(&mut self, command: &str, max_lines: usize) -> Result<String, CommandError> {
        match self.shell.as_mut() {
            Some(shell) => shell.exec(command, max_lines).await,
            None => Err(CommandError::Closed),
        }
    }

    pub fn is_open(&self) -> bool {
        self.shell.is_some()
    }

    /// Close the session. Calling this more than once is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut shell) = self.shell.take() {
            shell.close().await;
            tracing::debug!(target = %self.target, "Session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Dropping the shell releases the connection even without a close.
        if self.shell.is_some() {
            tracing::debug!(target = %self.target, "Session dropped without close");
        }
    }
}

/// Cipher list offered during negotiation.
///
/// CBC suites are only offered when `legacy` is set.
pub fn cipher_preference(legacy: bool) -> Vec<cipher::Name> {
    let mut ciphers = vec![
        cipher::CHACHA20_POLY1305,
        cipher::AES_256_GCM,
        cipher::AES_256_CTR,
        cipher::AES_192_CTR,
        cipher::AES_128_CTR,
    ];
    if legacy {
        ciphers.extend([cipher::AES_256_CBC, cipher::AES_192_CBC, cipher::AES_128_CBC]);
    }
    ciphers
}

#[derive(Clone)]
enum Credentials {
    Key(Arc<key::KeyPair>),
    Password(String),
}

/// SSH implementation of [`Connector`].
pub struct SshConnector {
    username: String,
    credentials: Credentials,
    config: Arc<client::Config>,
}

impl SshConnector {
    /// Build a connector, loading the private key if one is configured.
    pub fn new(ssh: &SshConfig) -> Result<Self, ConnectionError> {
        let credentials = match (&ssh.key_file, &ssh.password) {
            (Some(path), _) => {
                let pair = russh_keys::load_secret_key(path, ssh.key_passphrase.as_deref())
                    .map_err(|e| {
                        ConnectionError::Credentials(format!("{}: {}", path.display(), e))
                    })?;
                Credentials::Key(Arc::new(pair))
            }
            (None, Some(password)) => Credentials::Password(password.clone()),
            (None, None) => {
                return Err(ConnectionError::Credentials(
                    "no key file or password configured".to_string(),
                ));
            }
        };

        let config = client::Config {
            inactivity_timeout: Some(ssh.command_timeout() * 2),
            preferred: Preferred {
                cipher: Cow::Owned(cipher_preference(ssh.legacy_ciphers)),
                ..Default::default()
            },
            ..Default::default()
        };

        Ok(Self {
            username: ssh.username.clone(),
            credentials,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Shell>, ConnectionError> {
        let mut handle = client::connect(
            Arc::clone(&self.config),
            (target.host(), target.port()),
            ClientHandler,
        )
        .await
        .map_err(classify_connect_error)?;

        let authenticated = match &self.credentials {
            Credentials::Key(pair) => {
                handle
                    .authenticate_publickey(&self.username, Arc::clone(pair))
                    .await
            }
            Credentials::Password(password) => {
                handle
                    .authenticate_password(&self.username, password)
                    .await
            }
        }
        .map_err(|e| ConnectionError::Handshake(e.to_string()))?;

        if !authenticated {
            return Err(ConnectionError::AuthFailed(self.username.clone()));
        }

        Ok(Box::new(SshShell { handle }))
    }
}

fn classify_connect_error(err: russh::Error) -> ConnectionError {
    match err {
        russh::Error::IO(e) => ConnectionError::Unreachable(e.to_string()),
        other => ConnectionError::Handshake(other.to_string()),
    }
}

/// Host keys are not pinned; devices are addressed by configuration.
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

struct SshShell {
    handle: Handle<ClientHandler>,
}

#[async_trait]
impl Shell for SshShell {
    async fn exec(&mut self, command: &str, max_lines: usize) -> Result<String, CommandError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| CommandError::channel(command, e.to_string()))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| CommandError::channel(command, e.to_string()))?;

        let mut output = Vec::new();
        let mut lines = 0usize;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                    lines += data.iter().filter(|b| **b == b'\n').count();
                    output.extend_from_slice(data);
                    if lines > max_lines {
                        break;
                    }
                }
                ChannelMsg::Eof | ChannelMsg::Close => break,
                _ => {}
            }
        }

        let _ = channel.close().await;

        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn close(&mut self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            tracing::debug!(error = %e, "SSH disconnect failed");
        }
    }
}
