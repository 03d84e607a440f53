//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Error types for the telemetry evolution engine."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

use crate::fleet::{DeviceKey, DeviceKind};

/// Failures raised while evolving device state.
///
/// Every variant signals an internal contract breach: the cache is only ever
/// written by the generators, so a malformed entry is a bug, never input.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("cached state for {key} holds {found:?} telemetry, expected {expected:?}")]
    VariantMismatch {
        key: DeviceKey,
        expected: DeviceKind,
        found: DeviceKind,
    },
    #[error("cached state for {key} has an empty {field} list")]
    EmptySubReadings { key: DeviceKey, field: &'static str },
    #[error("cached state for {key} has {found} {field} entries, expected {expected}")]
    SubReadingCount {
        key: DeviceKey,
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, SimError>;
