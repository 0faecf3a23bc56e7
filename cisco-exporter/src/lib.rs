//! Prometheus exporter for Cisco devices.
//!
//! Every scrape of the metrics endpoint runs one collection pass over the
//! configured targets and renders the result in Prometheus text format.
//! Nothing is cached between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   HTTP Server   │────>│  Orchestrator   │────>│ Cisco devices   │
//! │   (/metrics)    │<────│  (per scrape)   │<────│     (SSH)       │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! cisco-exporter --config exporter.json5
//! cisco-exporter --targets 10.0.0.1,core-sw:2222 --listen 127.0.0.1:9362
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod exposition;
pub mod http;

pub use config::{ConfigError, ExporterConfig, HttpConfig};
pub use exposition::Registry;
pub use http::{HttpServer, create_router, scrape};
