//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Publish scheduler and run lifecycle."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, Utc};
use r_ems_common::config::{AppConfig, CadenceConfig};
use r_ems_common::metrics::{DurationHistogram, DurationSummary, PublishCounters};
use r_ems_common::time::capture_now;
use r_ems_logging::{ems_debug, ems_info, ems_warn, log_system_event, LogContext, SystemEventOutcome};
use r_ems_messaging::{telemetry_topic, Publication};
use r_ems_sim::{FleetDevice, FleetLayout, TelemetryEngine};
use r_ems_transport::Transport;
use tokio::sync::broadcast;

use crate::error::Result;

/// Fleet shape and cadence, fixed for the lifetime of a scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub namespace: String,
    pub sites: u32,
    pub layout: FleetLayout,
    pub cadence: CadenceConfig,
    pub seed: Option<u64>,
}

impl SchedulerSettings {
    /// Expects a configuration that already passed `AppConfig::validate`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            namespace: config.fleet.namespace.clone(),
            sites: config.fleet.sites,
            layout: FleetLayout::from_config(&config.fleet),
            cadence: config.cadence.clone(),
            seed: config.simulation.seed,
        }
    }

    pub fn device_count(&self) -> usize {
        self.sites as usize * self.layout.len()
    }
}

/// Outcome of one pass over the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: u64,
    pub published: u64,
    pub failed: u64,
}

impl TickReport {
    fn absorb(&mut self, other: TickReport) {
        self.published += other.published;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `cadence.max_ticks` was reached.
    TickLimit,
    /// A shutdown signal arrived or its sender went away.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub published: u64,
    pub failed: u64,
    pub tick_time: Option<DurationSummary>,
    pub stopped_by: StopReason,
}

/// Drives every device of the fleet through repeated ticks onto a transport.
///
/// Generation is strictly sequential: site ascending, then layout order, so
/// each device has at most one read-modify-write of its cached state in flight.
#[derive(Debug)]
pub struct PublishScheduler<T: Transport> {
    settings: SchedulerSettings,
    engine: TelemetryEngine,
    transport: T,
    ticks: u64,
    tick_time: DurationHistogram,
    counters: PublishCounters,
}

impl<T: Transport> PublishScheduler<T> {
    pub fn new(settings: SchedulerSettings, transport: T) -> Self {
        let engine = TelemetryEngine::new(settings.seed, settings.device_count());
        Self {
            settings,
            engine,
            transport,
            ticks: 0,
            tick_time: DurationHistogram::default(),
            counters: PublishCounters::default(),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> &TelemetryEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TelemetryEngine {
        &mut self.engine
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn counters(&self) -> &PublishCounters {
        &self.counters
    }

    /// One full pass over the fleet with a single capture time and no stagger.
    pub fn tick(&mut self, now: NaiveDateTime) -> Result<TickReport> {
        let started = Instant::now();
        let tick = self.ticks + 1;
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        for site_id in 1..=self.settings.sites {
            report.absorb(self.publish_site(tick, site_id, now)?);
        }
        self.finish_tick(&report, started);
        Ok(report)
    }

    /// Generate and publish every device of one site.
    ///
    /// A transport failure is logged and counted; the remaining devices are
    /// still published. Only generation or encoding failures abort.
    pub fn publish_site(&mut self, tick: u64, site_id: u32, now: NaiveDateTime) -> Result<TickReport> {
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        let devices: Vec<FleetDevice> = self.settings.layout.site_devices(site_id).collect();
        for device in &devices {
            let reading = self.engine.next_reading(device, now)?;
            let class = device.key.class;
            let topic = telemetry_topic(
                &self.settings.namespace,
                site_id,
                class.kind.segment(),
                class.instance,
            );
            let Publication { topic, payload } = Publication::encode(topic, &reading)?;
            let label = class.label();
            let ctx = LogContext::new()
                .with_site(site_id)
                .with_device(&label)
                .with_tick(tick)
                .with_transport(self.transport.name());
            match self.transport.publish(&topic, payload) {
                Ok(()) => {
                    report.published += 1;
                    ems_debug!(
                        context = ctx,
                        topic = topic.as_str(),
                        device_id = device.device_id,
                        "reading published"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    ems_warn!(
                        context = ctx,
                        topic = topic.as_str(),
                        "publish failed: {}",
                        err
                    );
                }
            }
        }
        Ok(report)
    }

    fn finish_tick(&mut self, report: &TickReport, started: Instant) {
        self.ticks = report.tick;
        self.tick_time.record(started.elapsed());
        self.counters.record_published(report.published);
        self.counters.record_failed(report.failed);
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .cadence
            .max_ticks
            .is_some_and(|limit| self.ticks >= limit)
    }

    fn log_progress(&self) {
        let cadence = &self.settings.cadence;
        let window = cadence.tick_interval.as_secs() * cadence.progress_every;
        let mean_ms = self.tick_time.summary().map(|s| s.mean_ms).unwrap_or_default();
        let batch_time = Utc::now().to_rfc3339();
        ems_info!(
            context = LogContext::new()
                .with_tick(self.ticks + 1)
                .with_transport(self.transport.name()),
            batch_time = batch_time.as_str(),
            window_secs = window,
            published_total = self.counters.published(),
            failed_total = self.counters.failed(),
            mean_tick_ms = mean_ms,
            "publishing {} telemetry batches over {} seconds",
            cadence.progress_every,
            window
        );
    }

    async fn staggered_tick(&mut self) -> Result<TickReport> {
        let started = Instant::now();
        let tick = self.ticks + 1;
        let stagger = self.settings.cadence.site_stagger;
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        for site_id in 1..=self.settings.sites {
            report.absorb(self.publish_site(tick, site_id, capture_now())?);
            if !stagger.is_zero() && site_id < self.settings.sites {
                tokio::time::sleep(stagger).await;
            }
        }
        self.finish_tick(&report, started);
        Ok(report)
    }

    /// Tick, sleep, repeat until the tick limit or a shutdown signal.
    ///
    /// Shutdown is honoured during the inter-tick sleep; a tick that has
    /// started always completes, so every device publishes exactly once per
    /// tick. A cache shape violation ends the run with an error.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<RunSummary> {
        let interval: Duration = self.settings.cadence.tick_interval;
        let start_ctx = LogContext::new().with_transport(self.transport.name());
        log_system_event(
            Some(&start_ctx),
            "telemetry.start",
            &format!(
                "publishing {} devices across {} sites every {}s",
                self.settings.device_count(),
                self.settings.sites,
                interval.as_secs()
            ),
            SystemEventOutcome::Success,
        );

        let stopped_by = loop {
            if self.limit_reached() {
                break StopReason::TickLimit;
            }
            if self.ticks % self.settings.cadence.progress_every.max(1) == 0 {
                self.log_progress();
            }

            let report = match self.staggered_tick().await {
                Ok(report) => report,
                Err(err) => {
                    log_system_event(
                        Some(&start_ctx.clone().with_tick(self.ticks + 1)),
                        "telemetry.abort",
                        &err.to_string(),
                        SystemEventOutcome::Fault,
                    );
                    return Err(err);
                }
            };
            if report.failed > 0 {
                ems_warn!(
                    context = start_ctx.clone().with_tick(report.tick),
                    published = report.published,
                    failed = report.failed,
                    "tick completed with publish failures"
                );
            }

            if self.limit_reached() {
                break StopReason::TickLimit;
            }
            tokio::select! {
                _ = shutdown.recv() => break StopReason::Shutdown,
                _ = tokio::time::sleep(interval) => {}
            }
        };

        let summary = RunSummary {
            ticks: self.ticks,
            published: self.counters.published(),
            failed: self.counters.failed(),
            tick_time: self.tick_time.summary(),
            stopped_by,
        };
        let outcome = if summary.failed == 0 {
            SystemEventOutcome::Success
        } else {
            SystemEventOutcome::Degraded
        };
        log_system_event(
            Some(&start_ctx.with_tick(summary.ticks)),
            "telemetry.stop",
            &format!(
                "stopped after {} ticks ({:?}): {} published, {} failed",
                summary.ticks, summary.stopped_by, summary.published, summary.failed
            ),
            outcome,
        );
        Ok(summary)
    }
}
