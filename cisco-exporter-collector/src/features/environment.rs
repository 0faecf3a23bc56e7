//! Chassis temperature and power supply status.

use async_trait::async_trait;
use cisco_exporter_common::{DescRef, MetricDesc};

use super::{CollectContext, FeatureCollector, metric_name};
use crate::emitter::{SampleSink, bool_value};
use crate::error::CollectError;
use crate::parsers::environment::{EnvironmentRecord, parse_environment};

pub const ENVIRONMENT_COMMAND: &str = "show environment";

pub struct EnvironmentCollector {
    temperature: DescRef,
    power_up: DescRef,
}

impl EnvironmentCollector {
    pub fn new(namespace: &str) -> Self {
        let labels = &["target", "item"];
        Self {
            temperature: MetricDesc::gauge(
                metric_name(namespace, "environment_sensor_temp"),
                "Sensor temperature (Celsius)",
                labels,
            ),
            power_up: MetricDesc::gauge(
                metric_name(namespace, "environment_power_up"),
                "Power supply status (1 = OK)",
                labels,
            ),
        }
    }
}

#[async_trait]
impl FeatureCollector for EnvironmentCollector {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn descriptors(&self) -> Vec<DescRef> {
        vec![self.temperature.clone(), self.power_up.clone()]
    }

    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let output = ctx.run(ENVIRONMENT_COMMAND).await?;

        for record in parse_environment(ctx.dialect, &output.text)? {
            let labels = ctx.labels_with(&[record.item()]);
            match record {
                EnvironmentRecord::Temperature { celsius, .. } => {
                    sink.emit(&self.temperature, labels, celsius)?;
                }
                EnvironmentRecord::PowerSupply { ok, .. } => {
                    sink.emit(&self.power_up, labels, bool_value(ok))?;
                }
            }
        }

        Ok(())
    }
}
