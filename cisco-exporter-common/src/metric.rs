use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Prometheus value kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Value can go up or down.
    Gauge,
    /// Monotonically increasing value.
    Counter,
}

impl MetricKind {
    /// Get the string used in `# TYPE` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of a metric: name, help text, kind and label names.
///
/// Descriptors are built once when a collector is registered and shared by
/// reference with every sample produced for them, so a sample can never change
/// its metric's kind or label layout.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MetricDesc {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
}

/// Shared handle to a metric descriptor.
pub type DescRef = Arc<MetricDesc>;

impl MetricDesc {
    /// Create a new descriptor.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        label_names: &[&str],
    ) -> DescRef {
        Arc::new(Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Create a gauge descriptor.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> DescRef {
        Self::new(name, help, MetricKind::Gauge, labels)
    }

    /// Create a counter descriptor.
    pub fn counter(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> DescRef {
        Self::new(name, help, MetricKind::Counter, labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// A single labeled value for a registered metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    desc: DescRef,
    label_values: Vec<String>,
    value: f64,
}

impl MetricSample {
    /// Build a sample, checking the label values against the descriptor.
    ///
    /// Label values are positional and must line up with
    /// [`MetricDesc::label_names`].
    pub fn new(desc: &DescRef, label_values: Vec<String>, value: f64) -> Result<Self> {
        if label_values.len() != desc.label_names.len() {
            return Err(Error::LabelArity {
                metric: desc.name.clone(),
                expected: desc.label_names.len(),
                actual: label_values.len(),
            });
        }

        Ok(Self {
            desc: Arc::clone(desc),
            label_values,
            value,
        })
    }

    pub fn desc(&self) -> &DescRef {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn kind(&self) -> MetricKind {
        self.desc.kind
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Get the value of a label by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.label_values[i].as_str())
    }

    /// Iterate over `(name, value)` label pairs in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.desc
            .label_names
            .iter()
            .zip(self.label_values.iter())
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
