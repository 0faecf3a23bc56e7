//! Scripted in-memory devices.
//!
//! [`MockConnector`] stands in for [`SshConnector`](crate::session::SshConnector)
//! so the pipeline can be exercised without a network. Each device answers a
//! fixed set of commands; anything else gets the IOS "invalid input" reply.
//! Built for unit tests and behind the `mock` feature.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CommandError, ConnectionError};
use crate::session::{Connector, Shell};
use crate::target::Target;

const IOS_VERSION: &str = include_str!("../tests/fixtures/ios_show_version.txt");
const IOS_XE_VERSION: &str = include_str!("../tests/fixtures/iosxe_show_version.txt");
const NX_OS_VERSION: &str = include_str!("../tests/fixtures/nxos_show_version.txt");

/// Reply to commands the device does not know.
pub const INVALID_INPUT: &str = "                 ^\n% Invalid input detected at '^' marker.\n";

/// A scripted device.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    commands: HashMap<String, String>,
    command_delays: HashMap<String, Duration>,
    connect_delay: Duration,
    connect_error: Option<ConnectionError>,
}

impl MockDevice {
    /// A device with no commands at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ios() -> Self {
        Self::new().with_command("show version", IOS_VERSION)
    }

    pub fn iosxe() -> Self {
        Self::new().with_command("show version", IOS_XE_VERSION)
    }

    pub fn nxos() -> Self {
        Self::new().with_command("show version", NX_OS_VERSION)
    }

    /// A device whose connection attempts fail with `error`.
    pub fn failing(error: ConnectionError) -> Self {
        Self {
            connect_error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_command(mut self, command: &str, output: &str) -> Self {
        self.commands.insert(command.to_string(), output.to_string());
        self
    }

    pub fn with_command_delay(mut self, command: &str, delay: Duration) -> Self {
        self.command_delays.insert(command.to_string(), delay);
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    released: AtomicUsize,
    executed: Mutex<Vec<(String, String)>>,
}

/// Connector serving [`MockDevice`]s by target host.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    devices: HashMap<String, Arc<MockDevice>>,
    counters: Arc<Counters>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `device` under `host`. Unknown hosts are unreachable.
    pub fn with_device(mut self, host: &str, device: MockDevice) -> Self {
        self.devices.insert(host.to_string(), Arc::new(device));
        self
    }

    /// Sessions successfully opened.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Sessions explicitly closed.
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Shells dropped, closed or not.
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Commands executed on `host`, in order.
    pub fn commands(&self, host: &str) -> Vec<String> {
        self.counters
            .executed
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Shell>, ConnectionError> {
        let device = self
            .devices
            .get(target.host())
            .cloned()
            .ok_or_else(|| ConnectionError::Unreachable(format!("no route to {}", target)))?;

        if !device.connect_delay.is_zero() {
            tokio::time::sleep(device.connect_delay).await;
        }
        if let Some(err) = &device.connect_error {
            return Err(err.clone());
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockShell {
            host: target.host().to_string(),
            device,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockShell {
    host: String,
    device: Arc<MockDevice>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Shell for MockShell {
    async fn exec(&mut self, command: &str, _max_lines: usize) -> Result<String, CommandError> {
        self.counters
            .executed
            .lock()
            .push((self.host.clone(), command.to_string()));

        if let Some(delay) = self.device.command_delays.get(command) {
            tokio::time::sleep(*delay).await;
        }

        Ok(self
            .device
            .commands
            .get(command)
            .cloned()
            .unwrap_or_else(|| INVALID_INPUT.to_string()))
    }

    async fn close(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockShell {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
