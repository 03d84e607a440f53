//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the telemetry generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Core shared primitives for the R-EMS telemetry generator workspace.
//! This crate exposes configuration loading, tracing setup, capture-time
//! helpers, and tick timing utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod time;

pub use config::{
    AppConfig, CadenceConfig, DeviceKindConfig, DeviceSlotConfig, FleetConfig, LoadedAppConfig,
    LoggingConfig, SimulationConfig, TransportConfig, TransportKind,
};
pub use logging::{init_tracing, LogFormat};
pub use metrics::{DurationHistogram, DurationSummary, PublishCounters};
pub use time::{capture_now, format_capture, CAPTURE_TIMESTAMP_FORMAT};
