//! Software version, uptime, memory and CPU utilization.

use async_trait::async_trait;
use cisco_exporter_common::{DescRef, MetricDesc};

use super::{CollectContext, FeatureCollector, metric_name};
use crate::dialect::Dialect;
use crate::emitter::{SampleSink, kilobytes_to_bytes};
use crate::error::CollectError;
use crate::parsers::facts::{MemoryUnit, parse_cpu, parse_memory, parse_version};

/// Memory command for `dialect`.
pub fn memory_command(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Ios | Dialect::IosXe => "show memory statistics",
        Dialect::NxOs => "show system resources",
    }
}

/// CPU command for `dialect`.
pub fn cpu_command(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Ios | Dialect::IosXe => "show processes cpu | include CPU utilization",
        Dialect::NxOs => "show system resources",
    }
}

pub struct FactsCollector {
    version: DescRef,
    uptime: DescRef,
    memory_total: DescRef,
    memory_used: DescRef,
    memory_free: DescRef,
    cpu_five_seconds: DescRef,
    cpu_interrupts: DescRef,
    cpu_one_minute: DescRef,
    cpu_five_minutes: DescRef,
}

impl FactsCollector {
    pub fn new(namespace: &str) -> Self {
        let name = |suffix: &str| metric_name(namespace, &format!("facts_{}", suffix));
        let memory = &["target", "type"];
        let target = &["target"];

        Self {
            version: MetricDesc::gauge(name("version"), "Running OS version", &["target", "version"]),
            uptime: MetricDesc::gauge(name("uptime_seconds"), "Device uptime in seconds", target),
            memory_total: MetricDesc::gauge(name("memory_total_bytes"), "Total memory", memory),
            memory_used: MetricDesc::gauge(name("memory_used_bytes"), "Used memory", memory),
            memory_free: MetricDesc::gauge(name("memory_free_bytes"), "Free memory", memory),
            cpu_five_seconds: MetricDesc::gauge(
                name("cpu_five_seconds_percent"),
                "CPU utilization for five seconds",
                target,
            ),
            cpu_interrupts: MetricDesc::gauge(
                name("cpu_interrupts_percent"),
                "Interrupt CPU utilization for five seconds",
                target,
            ),
            cpu_one_minute: MetricDesc::gauge(
                name("cpu_one_minute_percent"),
                "CPU utilization for one minute",
                target,
            ),
            cpu_five_minutes: MetricDesc::gauge(
                name("cpu_five_minutes_percent"),
                "CPU utilization for five minutes",
                target,
            ),
        }
    }

    /// Version and uptime come from the identification output.
    fn collect_version(
        &self,
        ctx: &CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let info = parse_version(ctx.dialect, ctx.identity)?;

        if let Some(version) = &info.version {
            sink.emit(&self.version, ctx.labels_with(&[version.as_str()]), 1.0)?;
        }
        if let Some(uptime) = info.uptime {
            sink.emit(&self.uptime, ctx.labels(), uptime.as_secs() as f64)?;
        }
        Ok(())
    }

    fn collect_memory(
        &self,
        ctx: &CollectContext<'_>,
        text: &str,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        for pool in parse_memory(ctx.dialect, text)? {
            let bytes = |v: u64| match pool.unit {
                MemoryUnit::Bytes => v as f64,
                MemoryUnit::Kilobytes => kilobytes_to_bytes(v),
            };
            let labels = ctx.labels_with(&[pool.kind.as_str()]);
            sink.emit(&self.memory_total, labels.clone(), bytes(pool.total))?;
            sink.emit(&self.memory_used, labels.clone(), bytes(pool.used))?;
            sink.emit(&self.memory_free, labels, bytes(pool.free))?;
        }
        Ok(())
    }

    fn collect_cpu(
        &self,
        ctx: &CollectContext<'_>,
        text: &str,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let Some(cpu) = parse_cpu(ctx.dialect, text)? else {
            return Ok(());
        };

        sink.emit(&self.cpu_five_seconds, ctx.labels(), cpu.five_seconds)?;
        let optional = [
            (&self.cpu_interrupts, cpu.interrupts),
            (&self.cpu_one_minute, cpu.one_minute),
            (&self.cpu_five_minutes, cpu.five_minutes),
        ];
        for (desc, value) in optional {
            if let Some(value) = value {
                sink.emit(desc, ctx.labels(), value)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FeatureCollector for FactsCollector {
    fn name(&self) -> &'static str {
        "facts"
    }

    fn descriptors(&self) -> Vec<DescRef> {
        vec![
            self.version.clone(),
            self.uptime.clone(),
            self.memory_total.clone(),
            self.memory_used.clone(),
            self.memory_free.clone(),
            self.cpu_five_seconds.clone(),
            self.cpu_interrupts.clone(),
            self.cpu_one_minute.clone(),
            self.cpu_five_minutes.clone(),
        ]
    }

    /// Version, memory and CPU are independent; the feature only fails if all
    /// three do.
    async fn collect(
        &self,
        ctx: &mut CollectContext<'_>,
        sink: &mut SampleSink,
    ) -> Result<(), CollectError> {
        let target = ctx.target.id().to_string();
        let mut last_error = None;
        let mut succeeded = 0;

        let mut step = |name: &str, result: Result<(), CollectError>| match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                tracing::debug!(target = %target, step = name, error = %e, "Facts step failed");
                last_error = Some(e);
            }
        };

        let version = self.collect_version(ctx, sink);
        step("version", version);

        let memory_cmd = memory_command(ctx.dialect);
        let cpu_cmd = cpu_command(ctx.dialect);

        match ctx.run(memory_cmd).await {
            Ok(memory_out) => {
                let memory = self.collect_memory(ctx, &memory_out.text, sink);
                step("memory", memory);

                // NX-OS reports both in the same output.
                let cpu = if cpu_cmd == memory_cmd {
                    self.collect_cpu(ctx, &memory_out.text, sink)
                } else {
                    match ctx.run(cpu_cmd).await {
                        Ok(cpu_out) => self.collect_cpu(ctx, &cpu_out.text, sink),
                        Err(e) => Err(e.into()),
                    }
                };
                step("cpu", cpu);
            }
            Err(e) => {
                step("memory", Err(e.into()));
                let cpu = match ctx.run(cpu_cmd).await {
                    Ok(cpu_out) => self.collect_cpu(ctx, &cpu_out.text, sink),
                    Err(e) => Err(e.into()),
                };
                step("cpu", cpu);
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(()),
        }
    }
}
