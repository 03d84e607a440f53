//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Publish scheduler and run lifecycle."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Publish scheduler for the R-EMS telemetry generator.

pub mod error;
pub mod scheduler;

pub use error::SchedulerError;
pub use scheduler::{PublishScheduler, RunSummary, SchedulerSettings, StopReason, TickReport};
