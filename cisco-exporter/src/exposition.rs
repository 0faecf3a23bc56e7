//! Prometheus text exposition.
//!
//! A [`Registry`] lives for exactly one scrape. Descriptors are registered up
//! front, samples are accepted only for registered descriptors, and the whole
//! thing is rendered once.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use cisco_exporter_common::{DescRef, Error, MetricSample, Result};

/// Per-scrape metric registry.
#[derive(Debug, Default)]
pub struct Registry {
    families: BTreeMap<String, Family>,
}

#[derive(Debug)]
struct Family {
    desc: DescRef,
    samples: Vec<MetricSample>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Re-registering the same descriptor is a no-op.
    pub fn register(&mut self, desc: DescRef) -> Result<()> {
        if let Some(existing) = self.families.get(desc.name()) {
            if *existing.desc == *desc {
                return Ok(());
            }
            return Err(Error::DuplicateMetric(desc.name().to_string()));
        }

        self.families.insert(
            desc.name().to_string(),
            Family {
                desc,
                samples: Vec::new(),
            },
        );
        Ok(())
    }

    /// Register several descriptors.
    pub fn register_all(&mut self, descs: impl IntoIterator<Item = DescRef>) -> Result<()> {
        for desc in descs {
            self.register(desc)?;
        }
        Ok(())
    }

    /// Add a sample for a registered metric.
    pub fn push(&mut self, sample: MetricSample) -> Result<()> {
        let family = self
            .families
            .get_mut(sample.name())
            .ok_or_else(|| Error::UnknownMetric(sample.name().to_string()))?;

        if !Arc::ptr_eq(&family.desc, sample.desc()) && *family.desc != **sample.desc() {
            return Err(Error::UnknownMetric(sample.name().to_string()));
        }

        family.samples.push(sample);
        Ok(())
    }

    /// Number of samples held.
    pub fn sample_count(&self) -> usize {
        self.families.values().map(|f| f.samples.len()).sum()
    }

    /// Render all families with at least one sample, sorted by name.
    pub fn render(&self) -> String {
        let mut output = String::with_capacity(self.sample_count() * 80);

        for (name, family) in &self.families {
            if family.samples.is_empty() {
                continue;
            }

            writeln!(output, "# HELP {} {}", name, escape_help(family.desc.help())).ok();
            writeln!(output, "# TYPE {} {}", name, family.desc.kind()).ok();

            for sample in &family.samples {
                writeln!(
                    output,
                    "{}{} {}",
                    name,
                    format_labels(sample),
                    format_value(sample.value())
                )
                .ok();
            }
        }

        output
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Escape a label value for exposition format.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn format_labels(sample: &MetricSample) -> String {
    let parts: Vec<String> = sample
        .labels()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    if parts.is_empty() {
        return String::new();
    }
    format!("{{{}}}", parts.join(","))
}
