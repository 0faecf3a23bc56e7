//! Optical transceiver power.

use async_trait::async_trait;
use cisco_exporter_common::{DescRef, MetricDesc};

use super::{CollectContext, FeatureCollector, metric_name};
use crate::dialect::Dialect;
use crate::emitter::{SampleSink, milliwatt_to_dbm};
use crate::error::{CollectError, CommandError, ParseError};
use crate::parsers::optics::{
    Power, PowerUnit, TransceiverReading, decompose_subslot_port, parse_interface_stats,
    parse_transceiver,
};

/// Command listing interfaces and their switching stats.
pub const LIST_COMMAND: &str = "show interfaces stats";

/// Transceiver detail command for one interface, if its name allows one.
pub fn transceiver_command(dialect: Dialect, interface: &str) -> Option<String> {
    match dialect {
        Dialect::Ios => Some(format!("show interfaces {} transceiver", interface)),
        Dialect::NxOs => Some(format!("show interface {} transceiver details", interface)),
        Dialect::IosXe => decompose_subslot_port(interface).map(|sp| {
            format!(
                "show hw-module subslot {}/{} transceiver {} status",
                sp.slot, sp.subslot, sp.port
            )
        }),
    }
}

/// Why an interface contributed no readings.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Administratively disabled in the listing.
    Disabled,
    /// Name does not decompose into slot/subslot/port.
    NameMismatch,
    /// Detail output had no readings (no optic, values not applicable).
    NoReadings,
    Command(CommandError),
    Parse(ParseError),
}

/// Result of the detail step for one interface.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    Collected(TransceiverReading),
    Skipped(SkipReason),
}

/// Per-interface outcomes, in discovery order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FanOutReport {
    pub entities: Vec<(String, EntityOutcome)>,
}

impl FanOutReport {
    /// Interfaces with readings.
    pub fn collected(&self) -> impl Iterator<Item = (&str, &TransceiverReading)> {
        self.entities.iter().filter_map(|(name, outcome)| match outcome {
            EntityOutcome::Collected(reading) => Some((name.as_str(), reading)),
            EntityOutcome::Skipped(_) => None,
        })
    }

    /// Skipped interfaces and why.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.entities.iter().filter_map(|(name, outcome)| match outcome {
            EntityOutcome::Skipped(reason) => Some((name.as_str(), reason)),
            EntityOutcome::Collected(_) => None,
        })
    }
}

/// Collects transmit and receive power per interface.
pub struct OpticsCollector {
    tx: DescRef,
    rx: DescRef,
}

impl OpticsCollector {
    pub fn new(namespace: &str) -> Self {
        let labels = &["target", "interface"];
        Self {
            tx: MetricDesc::gauge(
                metric_name(namespace, "optics_tx"),
                "Transceiver Tx power (dBm)",
                labels,
            ),
            rx: MetricDesc::gauge(
                metric_name(namespace, "optics_rx"),
                "Transceiver Rx power (dBm)",
                labels,
            ),
        }
    }

    /// List interfaces and fetch transceiver details for each enabled one.
    ///
    /// Fails only if the listing itself fails.
    pub async fn fan_out(&self, ctx: &mut CollectContext<'_>) -> Result<FanOutReport, CollectError> {
        let listing = ctx.run(LIST_COMMAND).await?;
        let entities = parse_interface_stats(&listing.text)?;

        let mut report = FanOutReport::default();
        for entity in entities {
            let outcome = if entity.enabled {
                self.detail(ctx, &entity.name).await
            } else {
                EntityOutcome::Skipped(SkipReason::Disabled)
            };

            if let EntityOutcome::Skipped(reason) = &outcome {
                tracing::debug!(
                    target = %ctx.target,
                    interface = %entity.name,
                    reason = ?reason,
                    "Transceiver skipped"
                );
            }
            report.entities.push((entity.name, outcome));
        }

        Ok(report)
    }

    async fn detail(&self, ctx: &mut CollectContext<'_>, interface: &str) -> EntityOutcome {
        let Some(command) = transceiver_command(ctx.dialect, interface) else {
            return EntityOutcome::Skipped(SkipReason::NameMismatch);
        };

        let output = match ctx.run(&command).await {
            Ok(output) => output,
            Err(e) => return EntityOutcome::Skipped(SkipReason::Command(e)),
        };

        match parse_transceiver(ctx.dialect, &output.text) {
            Ok(Some(reading)) => EntityOutcome::Collected(reading),
            Ok(None) => EntityOutcome::Skipped(SkipReason::NoReadings),
            Err(e) => EntityOutcome::Skipped(SkipReason::Parse(e)),
        }
    }
}

fn to_dbm(power: Power) -> f64 {
    match power.unit {
        PowerUnit::Dbm => power.value,
        PowerUnit::Milliwatt => milliwatt_to_dbm(power.value),
    }
}

#[async_trait]
impl FeatureCollector for OpticsCollector {
    fn name(&self) -> &'static str {
        "optics"
    }

    fn descriptors(&self) -> Vec<DescRef> {
        vec![self.tx.clone(), self.rx.clone()]
    }

    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let report = self.fan_out(ctx).await?;

        for (interface, reading) in report.collected() {
            let labels = ctx.labels_with(&[interface]);
            sink.emit(&self.tx, labels.clone(), to_dbm(reading.tx))?;
            sink.emit(&self.rx, labels, to_dbm(reading.rx))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transceiver_commands() {
        assert_eq!(
            transceiver_command(Dialect::Ios, "Gi1/0/49").as_deref(),
            Some("show interfaces Gi1/0/49 transceiver")
        );
        assert_eq!(
            transceiver_command(Dialect::NxOs, "Ethernet1/49").as_deref(),
            Some("show interface Ethernet1/49 transceiver details")
        );
        assert_eq!(
            transceiver_command(Dialect::IosXe, "TenGigabitEthernet0/1/0").as_deref(),
            Some("show hw-module subslot 0/1 transceiver 0 status")
        );
        assert_eq!(transceiver_command(Dialect::IosXe, "GigabitEthernet1"), None);
    }

    #[test]
    fn test_to_dbm() {
        let mw = Power {
            value: 1.0,
            unit: PowerUnit::Milliwatt,
        };
        assert_eq!(to_dbm(mw), 0.0);
        let dbm = Power {
            value: -2.5,
            unit: PowerUnit::Dbm,
        };
        assert_eq!(to_dbm(dbm), -2.5);
    }

    #[test]
    fn test_report_iterators() {
        let reading = TransceiverReading {
            tx: Power {
                value: -1.0,
                unit: PowerUnit::Dbm,
            },
            rx: Power {
                value: -2.0,
                unit: PowerUnit::Dbm,
            },
        };
        let report = FanOutReport {
            entities: vec![
                ("a".to_string(), EntityOutcome::Collected(reading)),
                ("b".to_string(), EntityOutcome::Skipped(SkipReason::Disabled)),
            ],
        };

        assert_eq!(report.collected().count(), 1);
        assert_eq!(
            report.skipped().collect::<Vec<_>>(),
            vec![("b", &SkipReason::Disabled)]
        );
    }
}
