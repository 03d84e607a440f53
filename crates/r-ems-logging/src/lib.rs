//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros for telemetry publishing."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging helpers shared by the telemetry crates. Every event carries
//! the same `site`, `device`, `tick` and `transport` fields so log pipelines can
//! correlate a publish failure with the reading that caused it.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber for tests and ad-hoc tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Site number the event relates to.
    pub site: Option<u32>,
    /// Device label such as `bms1` or `ev1`.
    pub device: Option<&'a str>,
    /// Scheduler tick the event was produced in.
    pub tick: Option<u64>,
    /// Transport sink name.
    pub transport: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a site number.
    pub fn with_site(mut self, site: u32) -> Self {
        self.site = Some(site);
        self
    }

    /// Attach a device label.
    pub fn with_device(mut self, device: &'a str) -> Self {
        self.device = Some(device);
        self
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach the transport name.
    pub fn with_transport(mut self, transport: &'a str) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation completed but something was skipped or dropped.
    Degraded,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Degraded => "degraded",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event (startup, shutdown, run summary).
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level, hence one arm per outcome.
    match outcome {
        SystemEventOutcome::Success => ems_info!(context = ctx, event = event, outcome = outcome.as_str(), "{}", message),
        SystemEventOutcome::Degraded => ems_warn!(context = ctx, event = event, outcome = outcome.as_str(), "{}", message),
        SystemEventOutcome::Fault => ems_error!(context = ctx, event = event, outcome = outcome.as_str(), "{}", message),
    }
}
