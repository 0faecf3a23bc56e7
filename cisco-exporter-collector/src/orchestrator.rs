//! Per-request fan-out over targets.
//!
//! One collection pass spawns one task per target, bounded by a semaphore.
//! Each task owns its session and sample buffers and reports back through a
//! channel; the aggregator emits exactly one reachability sample per target,
//! whatever happened to the task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cisco_exporter_common::{DescRef, MetricDesc, MetricSample};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::config::CollectorConfig;
use crate::dialect::{self, Dialect};
use crate::emitter::{SampleSink, bool_value};
use crate::error::ConnectionError;
use crate::features::{CollectContext, FeatureCollector, build_collectors, metric_name};
use crate::runner::CommandRunner;
use crate::session::{Connector, Session, SshConnector};
use crate::target::Target;

/// How far a target's pass got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// Session opened and dialect resolved.
    Up,
    /// The session could not be opened.
    ConnectionFailed,
    /// The device runs an OS we do not recognize.
    Unresolved,
    /// The request deadline passed first.
    DeadlineExceeded,
    /// The task ended without reporting.
    Aborted,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Up => "up",
            TargetStatus::ConnectionFailed => "connection_failed",
            TargetStatus::Unresolved => "unresolved",
            TargetStatus::DeadlineExceeded => "deadline_exceeded",
            TargetStatus::Aborted => "aborted",
        }
    }
}

/// Outcome of one target's pass.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: String,
    pub status: TargetStatus,
    pub dialect: Option<Dialect>,
    /// Collectors that returned an error.
    pub failed_features: Vec<&'static str>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl TargetReport {
    fn new(target: &Target, status: TargetStatus, duration: Duration) -> Self {
        Self {
            target: target.id().to_string(),
            status,
            dialect: None,
            failed_features: Vec::new(),
            duration,
            error: None,
        }
    }
}

/// Everything produced by one collection pass.
#[derive(Debug, Default)]
pub struct CollectionResult {
    pub samples: Vec<MetricSample>,
    /// One report per distinct target, in completion order.
    pub reports: Vec<TargetReport>,
}

impl CollectionResult {
    pub fn report(&self, target: &str) -> Option<&TargetReport> {
        self.reports.iter().find(|r| r.target == target)
    }
}

struct TargetOutcome {
    report: TargetReport,
    samples: Vec<MetricSample>,
}

struct Pipeline {
    connector: Arc<dyn Connector>,
    collectors: Vec<Arc<dyn FeatureCollector>>,
    runner: CommandRunner,
    connect_timeout: Duration,
}

impl Pipeline {
    /// Run the full pass for one target. The session is closed on every
    /// return path; if this future is dropped the session is dropped with it.
    async fn run(&self, target: &Target) -> TargetOutcome {
        let start = Instant::now();

        let mut session =
            match Session::open(self.connector.as_ref(), target, self.connect_timeout).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(target = %target, error = %e, "Connection failed");
                    let mut report =
                        TargetReport::new(target, TargetStatus::ConnectionFailed, start.elapsed());
                    report.error = Some(e.to_string());
                    return TargetOutcome {
                        report,
                        samples: Vec::new(),
                    };
                }
            };

        let identity = match dialect::resolve(&mut session, &self.runner).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "Dialect resolution failed");
                session.close().await;
                let mut report =
                    TargetReport::new(target, TargetStatus::Unresolved, start.elapsed());
                report.error = Some(e.to_string());
                return TargetOutcome {
                    report,
                    samples: Vec::new(),
                };
            }
        };
        let dialect = identity.dialect;
        tracing::debug!(target = %target, dialect = %dialect, "Dialect resolved");

        let mut samples = Vec::new();
        let mut failed_features = Vec::new();
        {
            let mut ctx = CollectContext {
                session: &mut session,
                runner: &self.runner,
                dialect,
                identity: &identity.text,
                target,
            };

            for collector in &self.collectors {
                let feature_start = Instant::now();
                let mut sink = SampleSink::new();

                match collector.collect(&mut ctx, &mut sink).await {
                    Ok(()) => {
                        tracing::debug!(
                            target = %target,
                            feature = collector.name(),
                            samples = sink.len(),
                            elapsed_ms = feature_start.elapsed().as_millis() as u64,
                            "Feature collected"
                        );
                        samples.extend(sink.into_samples());
                    }
                    Err(e) => {
                        tracing::debug!(
                            target = %target,
                            feature = collector.name(),
                            error = %e,
                            "Feature collection failed"
                        );
                        failed_features.push(collector.name());
                    }
                }
            }
        }

        session.close().await;

        let mut report = TargetReport::new(target, TargetStatus::Up, start.elapsed());
        report.dialect = Some(dialect);
        report.failed_features = failed_features;
        TargetOutcome { report, samples }
    }
}

/// Runs collection passes over a set of targets.
#[derive(Clone)]
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    max_concurrency: usize,
    request_timeout: Duration,
    unsupported_dialect_up: bool,
    up: DescRef,
    duration: DescRef,
}

impl Orchestrator {
    /// Build an orchestrator using `connector` for sessions.
    pub fn new(config: &CollectorConfig, connector: Arc<dyn Connector>) -> Self {
        let collectors = build_collectors(&config.features, &config.namespace);

        Self {
            pipeline: Arc::new(Pipeline {
                connector,
                collectors,
                runner: CommandRunner::from_config(&config.ssh),
                connect_timeout: config.ssh.connect_timeout(),
            }),
            max_concurrency: config.max_concurrency.max(1),
            request_timeout: config.request_timeout(),
            unsupported_dialect_up: config.unsupported_dialect_up,
            up: MetricDesc::gauge(
                metric_name(&config.namespace, "up"),
                "Scrape of target was successful",
                &["target"],
            ),
            duration: MetricDesc::gauge(
                metric_name(&config.namespace, "collector_duration_seconds"),
                "Duration of a scrape by target",
                &["target"],
            ),
        }
    }

    /// Build an orchestrator connecting over SSH.
    pub fn from_config(config: &CollectorConfig) -> Result<Self, ConnectionError> {
        let connector = SshConnector::new(&config.ssh)?;
        Ok(Self::new(config, Arc::new(connector)))
    }

    /// Every descriptor a pass may produce, built-in ones first.
    pub fn descriptors(&self) -> Vec<DescRef> {
        let mut descs = vec![self.up.clone(), self.duration.clone()];
        for collector in &self.pipeline.collectors {
            descs.extend(collector.descriptors());
        }
        descs
    }

    /// Collect from all `targets` within the request deadline.
    pub async fn collect_all(&self, targets: &[Target]) -> CollectionResult {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.request_timeout;

        let mut seen = HashSet::new();
        let targets: Vec<Target> = targets
            .iter()
            .filter(|t| seen.insert(t.id().to_string()))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, mut rx) = mpsc::channel::<TargetOutcome>(targets.len().max(1));
        let mut tasks = JoinSet::new();

        for target in targets.iter().cloned() {
            let pipeline = Arc::clone(&self.pipeline);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tasks.spawn(async move {
                let task_start = Instant::now();
                let work = async {
                    let _permit = semaphore.acquire().await.ok();
                    pipeline.run(&target).await
                };

                let outcome = match tokio::time::timeout_at(deadline, work).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(target = %target, "Request deadline exceeded");
                        TargetOutcome {
                            report: TargetReport::new(
                                &target,
                                TargetStatus::DeadlineExceeded,
                                task_start.elapsed(),
                            ),
                            samples: Vec::new(),
                        }
                    }
                };

                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut result = CollectionResult::default();
        let mut sink = SampleSink::new();

        while let Some(outcome) = rx.recv().await {
            let report = outcome.report;
            self.emit_builtin(&mut sink, &report.target, report.status, report.duration);
            if report.status == TargetStatus::Up {
                result.samples.extend(outcome.samples);
            }
            result.reports.push(report);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Collection task failed");
            }
        }

        // Tasks that died before reporting still get a reachability sample.
        for target in &targets {
            if result.report(target.id()).is_none() {
                let report =
                    TargetReport::new(target, TargetStatus::Aborted, start.elapsed());
                self.emit_builtin(&mut sink, &report.target, report.status, report.duration);
                result.reports.push(report);
            }
        }

        result.samples.extend(sink.into_samples());

        tracing::debug!(
            targets = targets.len(),
            samples = result.samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Collection pass finished"
        );

        result
    }

    fn emit_builtin(
        &self,
        sink: &mut SampleSink,
        target: &str,
        status: TargetStatus,
        duration: Duration,
    ) {
        let up = match status {
            TargetStatus::Up => true,
            TargetStatus::Unresolved => self.unsupported_dialect_up,
            _ => false,
        };

        let emitted = sink
            .emit(&self.up, vec![target.to_string()], bool_value(up))
            .and_then(|_| {
                sink.emit(
                    &self.duration,
                    vec![target.to_string()],
                    duration.as_secs_f64(),
                )
            });
        if let Err(e) = emitted {
            tracing::warn!(target = %target, error = %e, "Failed to emit reachability");
        }
    }
}
