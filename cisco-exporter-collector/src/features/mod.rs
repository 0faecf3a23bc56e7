//! Feature collectors, one per metric domain.
//!
//! Every collector declares its metric descriptors up front and, given an open
//! session and the resolved dialect, runs its commands and emits samples. An
//! `Err` from [`FeatureCollector::collect`] means the whole feature is useless
//! for this target; per-entity failures are handled inside the collector.

pub mod bgp;
pub mod environment;
pub mod facts;
pub mod interfaces;
pub mod optics;

use std::sync::Arc;

use async_trait::async_trait;
use cisco_exporter_common::DescRef;

use crate::config::FeaturesConfig;
use crate::dialect::Dialect;
use crate::emitter::SampleSink;
use crate::error::{CollectError, CommandError};
use crate::runner::{CommandOutput, CommandRunner};
use crate::session::Session;
use crate::target::Target;

pub use bgp::BgpCollector;
pub use environment::EnvironmentCollector;
pub use facts::FactsCollector;
pub use interfaces::InterfacesCollector;
pub use optics::OpticsCollector;

/// Everything a collector needs for one target.
pub struct CollectContext<'a> {
    pub session: &'a mut Session,
    pub runner: &'a CommandRunner,
    /// Resolved once per pass; collectors must not re-detect it.
    pub dialect: Dialect,
    /// Output of the identification command run during resolution.
    pub identity: &'a str,
    pub target: &'a Target,
}

impl CollectContext<'_> {
    /// Run a command on the target's session.
    pub async fn run(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        self.runner.run(self.session, command).await
    }

    /// Label values shared by all feature metrics (`target`).
    pub fn labels(&self) -> Vec<String> {
        vec![self.target.id().to_string()]
    }

    /// Shared labels followed by `extra`.
    pub fn labels_with(&self, extra: &[&str]) -> Vec<String> {
        let mut labels = self.labels();
        labels.extend(extra.iter().map(|v| v.to_string()));
        labels
    }
}

/// A pluggable metric domain.
#[async_trait]
pub trait FeatureCollector: Send + Sync {
    /// Name used in logs and in the `features` config.
    fn name(&self) -> &'static str;

    /// Descriptors for every metric this collector may emit.
    fn descriptors(&self) -> Vec<DescRef>;

    /// Collect samples for one target.
    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError>;
}

/// Full metric name under `namespace`.
pub(crate) fn metric_name(namespace: &str, name: &str) -> String {
    format!("{}_{}", namespace, name)
}

/// Build the enabled collectors.
pub fn build_collectors(
    features: &FeaturesConfig,
    namespace: &str,
) -> Vec<Arc<dyn FeatureCollector>> {
    let mut collectors: Vec<Arc<dyn FeatureCollector>> = Vec::new();

    if features.bgp {
        collectors.push(Arc::new(BgpCollector::new(namespace)));
    }
    if features.environment {
        collectors.push(Arc::new(EnvironmentCollector::new(namespace)));
    }
    if features.facts {
        collectors.push(Arc::new(FactsCollector::new(namespace)));
    }
    if features.interfaces {
        collectors.push(Arc::new(InterfacesCollector::new(namespace)));
    }
    if features.optics {
        collectors.push(Arc::new(OpticsCollector::new(namespace)));
    }

    collectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_collectors_respects_flags() {
        let all = build_collectors(&FeaturesConfig::default(), "cisco");
        let names: Vec<_> = all.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["bgp", "environment", "facts", "interfaces", "optics"]);

        let features = FeaturesConfig {
            bgp: false,
            interfaces: false,
            ..Default::default()
        };
        let names: Vec<_> = build_collectors(&features, "cisco")
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["environment", "facts", "optics"]);
    }

    #[test]
    fn test_descriptor_names_unique_and_namespaced() {
        let collectors = build_collectors(&FeaturesConfig::default(), "net");
        let mut names: Vec<String> = collectors
            .iter()
            .flat_map(|c| c.descriptors())
            .map(|d| d.name().to_string())
            .collect();

        assert!(names.iter().all(|n| n.starts_with("net_")));
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_target_is_first_label() {
        let collectors = build_collectors(&FeaturesConfig::default(), "cisco");
        for desc in collectors.iter().flat_map(|c| c.descriptors()) {
            assert_eq!(desc.label_names()[0], "target", "{}", desc.name());
        }
    }
}
