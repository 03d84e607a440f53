//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Publish scheduler error types."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use r_ems_messaging::MessagingError;
use r_ems_sim::SimError;
use thiserror::Error;

/// Fatal scheduler failures. Transport errors are deliberately absent: they
/// are logged and counted per device, never propagated.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("device state violated its cached shape: {0}")]
    Sim(#[from] SimError),
    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
