//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Immutable reading snapshots and the per-class telemetry variant."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::NaiveDateTime;
use r_ems_common::time::capture_timestamp;
use serde::Serialize;

use crate::battery::BatteryTelemetry;
use crate::ev_charger::EvChargerTelemetry;
use crate::fleet::DeviceKind;
use crate::solar::SolarTelemetry;

/// Device-class specific body of a reading. Serialized without a tag so the
/// payload is the flat field set each downstream DTO expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Telemetry {
    Battery(BatteryTelemetry),
    Solar(SolarTelemetry),
    EvCharger(EvChargerTelemetry),
}

impl Telemetry {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Telemetry::Battery(_) => DeviceKind::Battery,
            Telemetry::Solar(_) => DeviceKind::SolarArray,
            Telemetry::EvCharger(_) => DeviceKind::EvCharger,
        }
    }
}

/// One published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: u32,
    #[serde(with = "capture_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub telemetry: Telemetry,
}

impl Reading {
    pub fn kind(&self) -> DeviceKind {
        self.telemetry.kind()
    }
}
