//! BGP neighbor sessions.

use async_trait::async_trait;
use cisco_exporter_common::{DescRef, MetricDesc};

use super::{CollectContext, FeatureCollector, metric_name};
use crate::emitter::{SampleSink, bool_value};
use crate::error::CollectError;
use crate::parsers::bgp::{BgpSession, parse_bgp_summary};

pub const SUMMARY_COMMAND: &str = "show bgp all summary";

pub struct BgpCollector {
    up: DescRef,
    prefixes_received: DescRef,
    messages_input: DescRef,
    messages_output: DescRef,
}

impl BgpCollector {
    pub fn new(namespace: &str) -> Self {
        let labels = &["target", "address_family", "asn", "ip"];
        let name = |suffix: &str| metric_name(namespace, &format!("bgp_session_{}", suffix));

        Self {
            up: MetricDesc::gauge(name("up"), "Session is up (1 = Established)", labels),
            prefixes_received: MetricDesc::gauge(
                name("prefixes_received_count"),
                "Number of received prefixes",
                labels,
            ),
            messages_input: MetricDesc::gauge(
                name("messages_input_count"),
                "Number of received messages",
                labels,
            ),
            messages_output: MetricDesc::gauge(
                name("messages_output_count"),
                "Number of transmitted messages",
                labels,
            ),
        }
    }

    fn emit(
        &self,
        ctx: &CollectContext<'_>,
        session: &BgpSession,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let labels = ctx.labels_with(&[
            session.address_family.as_str(),
            session.asn.as_str(),
            session.neighbor.as_str(),
        ]);

        sink.emit(&self.up, labels.clone(), bool_value(session.up))?;
        sink.emit(
            &self.prefixes_received,
            labels.clone(),
            session.prefixes_received as f64,
        )?;
        sink.emit(
            &self.messages_input,
            labels.clone(),
            session.messages_input as f64,
        )?;
        sink.emit(&self.messages_output, labels, session.messages_output as f64)?;
        Ok(())
    }
}

#[async_trait]
impl FeatureCollector for BgpCollector {
    fn name(&self) -> &'static str {
        "bgp"
    }

    fn descriptors(&self) -> Vec<DescRef> {
        vec![
            self.up.clone(),
            self.prefixes_received.clone(),
            self.messages_input.clone(),
            self.messages_output.clone(),
        ]
    }

    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let output = ctx.run(SUMMARY_COMMAND).await?;
        let sessions = parse_bgp_summary(ctx.dialect, &output.text)?;

        for session in &sessions {
            self.emit(ctx, session, sink)?;
        }
        Ok(())
    }
}
