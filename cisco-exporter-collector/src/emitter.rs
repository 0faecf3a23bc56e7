//! Request-scoped sample sink and unit conversions.

use cisco_exporter_common::{DescRef, MetricSample, Result};

/// Buffer of samples produced by one feature collector run.
#[derive(Debug, Default)]
pub struct SampleSink {
    samples: Vec<MetricSample>,
}

impl SampleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample for `desc`. Label values are positional.
    pub fn emit(&mut self, desc: &DescRef, label_values: Vec<String>, value: f64) -> Result<()> {
        let sample = MetricSample::new(desc, label_values, value)?;
        tracing::trace!(metric = %sample.name(), value, "Sample emitted");
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}

/// Convert optical power from milliwatts to dBm.
///
/// Zero or negative power has no dBm equivalent and yields `-inf` / `NaN`.
pub fn milliwatt_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

/// Convert kilobytes (1024 bytes) to bytes.
pub fn kilobytes_to_bytes(kb: u64) -> f64 {
    (kb as f64) * 1024.0
}

pub fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisco_exporter_common::{Error, MetricDesc};

    #[test]
    fn test_emit_checks_arity() {
        let desc = MetricDesc::gauge("cisco_up", "Target reachable", &["target"]);
        let mut sink = SampleSink::new();

        sink.emit(&desc, vec!["r1".to_string()], 1.0).unwrap();
        let err = sink.emit(&desc, vec![], 1.0).unwrap_err();

        assert!(matches!(err, Error::LabelArity { .. }));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.samples()[0].label("target"), Some("r1"));
    }

    #[test]
    fn test_milliwatt_to_dbm() {
        assert_eq!(milliwatt_to_dbm(1.0), 0.0);
        assert!((milliwatt_to_dbm(0.5) - (-3.0103)).abs() < 1e-4);
        assert!((milliwatt_to_dbm(0.0001) - (-40.0)).abs() < 1e-9);
        assert_eq!(milliwatt_to_dbm(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(kilobytes_to_bytes(2), 2048.0);
        assert_eq!(bool_value(true), 1.0);
        assert_eq!(bool_value(false), 0.0);
    }
}
