//! Interface status and traffic counters.

use async_trait::async_trait;
use cisco_exporter_common::{DescRef, MetricDesc};

use super::{CollectContext, FeatureCollector, metric_name};
use crate::dialect::Dialect;
use crate::emitter::{SampleSink, bool_value};
use crate::error::CollectError;
use crate::parsers::interfaces::{InterfaceRecord, parse_interfaces};

/// Interface listing command for `dialect`.
pub fn interfaces_command(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Ios | Dialect::IosXe => "show interfaces",
        Dialect::NxOs => "show interface",
    }
}

type CounterField = fn(&InterfaceRecord) -> u64;

pub struct InterfacesCollector {
    counters: Vec<(DescRef, CounterField)>,
    admin_up: DescRef,
    up: DescRef,
    error_status: DescRef,
    info: DescRef,
}

impl InterfacesCollector {
    pub fn new(namespace: &str) -> Self {
        let labels = &["target", "name"];
        let name = |suffix: &str| metric_name(namespace, &format!("interface_{}", suffix));

        let counter = |suffix: &str, help: &str, field: CounterField| {
            (MetricDesc::counter(name(suffix), help, labels), field)
        };

        let counters = vec![
            counter("receive_bytes", "Received data in bytes", |r| r.receive_bytes),
            counter("receive_errors", "Number of errors caused by incoming packets", |r| {
                r.receive_errors
            }),
            counter("receive_drops", "Number of dropped incoming packets", |r| {
                r.receive_drops
            }),
            counter("receive_broadcast", "Received broadcast packets", |r| {
                r.receive_broadcast
            }),
            counter("receive_multicast", "Received multicast packets", |r| {
                r.receive_multicast
            }),
            counter("transmit_bytes", "Transmitted data in bytes", |r| r.transmit_bytes),
            counter("transmit_errors", "Number of errors caused by outgoing packets", |r| {
                r.transmit_errors
            }),
            counter("transmit_drops", "Number of dropped outgoing packets", |r| {
                r.transmit_drops
            }),
        ];

        Self {
            counters,
            admin_up: MetricDesc::gauge(
                name("admin_up"),
                "Admin operational status",
                labels,
            ),
            up: MetricDesc::gauge(name("up"), "Interface operational status", labels),
            error_status: MetricDesc::gauge(
                name("error_status"),
                "Interface is error-disabled or admin and operational status differ",
                labels,
            ),
            info: MetricDesc::gauge(
                name("info"),
                "Descriptive interface attributes",
                &["target", "name", "description", "mac", "speed"],
            ),
        }
    }

    fn emit(
        &self,
        ctx: &CollectContext<'_>,
        record: &InterfaceRecord,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let labels = ctx.labels_with(&[record.name.as_str()]);

        for (desc, field) in &self.counters {
            sink.emit(desc, labels.clone(), field(record) as f64)?;
        }
        sink.emit(&self.admin_up, labels.clone(), bool_value(record.admin_up))?;
        sink.emit(&self.up, labels.clone(), bool_value(record.oper_up))?;
        let error = record.error_status || record.admin_up != record.oper_up;
        sink.emit(&self.error_status, labels, bool_value(error))?;

        let info_labels = ctx.labels_with(&[
            record.name.as_str(),
            record.description.as_str(),
            record.mac.as_str(),
            record.speed.as_str(),
        ]);
        sink.emit(&self.info, info_labels, 1.0)?;
        Ok(())
    }
}

#[async_trait]
impl FeatureCollector for InterfacesCollector {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    fn descriptors(&self) -> Vec<DescRef> {
        let mut descs: Vec<DescRef> = self.counters.iter().map(|(d, _)| d.clone()).collect();
        descs.extend([
            self.admin_up.clone(),
            self.up.clone(),
            self.error_status.clone(),
            self.info.clone(),
        ]);
        descs
    }

    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let output = ctx.run(interfaces_command(ctx.dialect)).await?;

        for record in parse_interfaces(ctx.dialect, &output.text)? {
            self.emit(ctx, &record, sink)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{MockConnector, MockDevice};
    use crate::runner::CommandRunner;
    use crate::session::Session;
    use crate::target::Target;

    const SHOW_INTERFACES: &str = "\
GigabitEthernet0/1 is up, line protocol is up
  Hardware is Gigabit Ethernet, address is 0023.3362.a000 (bia 0023.3362.a000)
  Description: Uplink to core
  Full Duplex, 1000Mbps, link type is auto, media type is T
     123456 packets input, 98765432 bytes, 0 no buffer
     3 input errors, 0 CRC, 0 frame, 0 overrun, 0 ignored
     234567 packets output, 87654321 bytes, 0 underruns
GigabitEthernet0/2 is administratively down, line protocol is down
  Hardware is Gigabit Ethernet, address is 0023.3362.a001 (bia 0023.3362.a001)
GigabitEthernet0/3 is down, line protocol is down (err-disabled)
  Hardware is Gigabit Ethernet, address is 0023.3362.a002 (bia 0023.3362.a002)
";

    #[tokio::test]
    async fn test_collect_ios_interfaces() {
        let connector = MockConnector::new().with_device(
            "sw1",
            MockDevice::ios().with_command("show interfaces", SHOW_INTERFACES),
        );
        let target: Target = "sw1".parse().unwrap();
        let mut session = Session::open(&connector, &target, Duration::from_secs(1))
            .await
            .unwrap();
        let runner = CommandRunner::new(Duration::from_secs(1), 1000);
        let mut ctx = CollectContext {
            session: &mut session,
            runner: &runner,
            dialect: Dialect::Ios,
            identity: "",
            target: &target,
        };

        let collector = InterfacesCollector::new("cisco");
        let mut sink = SampleSink::new();
        collector.collect(&mut ctx, &mut sink).await.unwrap();
        session.close().await;

        let value = |metric: &str, name: &str| {
            sink.samples()
                .iter()
                .find(|s| s.name() == metric && s.label("name") == Some(name))
                .map(|s| s.value())
        };

        assert_eq!(value("cisco_interface_receive_bytes", "GigabitEthernet0/1"), Some(98765432.0));
        assert_eq!(value("cisco_interface_receive_errors", "GigabitEthernet0/1"), Some(3.0));
        assert_eq!(value("cisco_interface_up", "GigabitEthernet0/1"), Some(1.0));
        assert_eq!(value("cisco_interface_error_status", "GigabitEthernet0/1"), Some(0.0));

        // Admin down and oper down agree, so no error.
        assert_eq!(value("cisco_interface_admin_up", "GigabitEthernet0/2"), Some(0.0));
        assert_eq!(value("cisco_interface_error_status", "GigabitEthernet0/2"), Some(0.0));

        assert_eq!(value("cisco_interface_error_status", "GigabitEthernet0/3"), Some(1.0));

        let info = sink
            .samples()
            .iter()
            .find(|s| s.name() == "cisco_interface_info" && s.label("name") == Some("GigabitEthernet0/1"))
            .unwrap();
        assert_eq!(info.label("description"), Some("Uplink to core"));
        assert_eq!(info.label("mac"), Some("0023.3362.a000"));
    }

    #[test]
    fn test_interfaces_command() {
        assert_eq!(interfaces_command(Dialect::IosXe), "show interfaces");
        assert_eq!(interfaces_command(Dialect::NxOs), "show interface");
    }
}
