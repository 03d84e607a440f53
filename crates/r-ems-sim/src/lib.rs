//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry evolution engine module exports and shared types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Telemetry evolution engine for the R-EMS fleet generator.
//!
//! Values evolve as bounded random walks and sticky statuses from the previous
//! tick's reading, so a stream looks like a slowly drifting physical process
//! rather than independent draws. Everything here is synchronous and pure
//! apart from the random source handed in by the caller.

pub mod battery;
pub mod cache;
pub mod error;
pub mod ev_charger;
pub mod fleet;
pub mod generator;
pub mod models;
pub mod reading;
pub mod solar;

pub use battery::{BatteryTelemetry, HealthStatus};
pub use cache::DeviceStateCache;
pub use error::SimError;
pub use ev_charger::{ConnectorReading, ConnectorStatus, EvChargerTelemetry, PaymentSystemStatus};
pub use fleet::{
    device_catalog, DeviceClass, DeviceDescriptor, DeviceKey, DeviceKind, FleetDevice, FleetLayout,
};
pub use generator::{generate, TelemetryEngine};
pub use models::{bounded_walk, sticky_status, WalkSpec};
pub use reading::{Reading, Telemetry};
pub use solar::{InverterStatus, SolarTelemetry, StringReading};
