//! SSH/CLI collection pipeline for Cisco devices.
//!
//! Each collection pass opens one SSH session per target, identifies the
//! operating system once, and runs the enabled feature collectors over that
//! session. Command output is parsed into typed records and turned into
//! metric samples.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Orchestrator │──>│   Session    │──>│   Dialect    │──>│   Features   │
//! │  (fan-out)   │   │  (SSH exec)  │   │  (resolve)   │   │ (parse/emit) │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Supported dialects are IOS, IOS-XE and NX-OS. The feature set is bgp,
//! environment, facts, interfaces and optics.

pub mod config;
pub mod dialect;
pub mod emitter;
pub mod error;
pub mod features;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod orchestrator;
pub mod parsers;
pub mod runner;
pub mod session;
pub mod target;

pub use config::{CollectorConfig, FeaturesConfig, SshConfig};
pub use dialect::Dialect;
pub use error::{CollectError, CommandError, ConnectionError, ParseError, ResolutionError};
pub use features::{CollectContext, FeatureCollector};
pub use orchestrator::{CollectionResult, Orchestrator, TargetReport, TargetStatus};
pub use runner::{CommandOutput, CommandRunner};
pub use session::{Connector, Session, Shell, SshConnector};
pub use target::Target;
