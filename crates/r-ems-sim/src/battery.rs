//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Battery storage telemetry model."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::NaiveDateTime;
use r_ems_common::time::capture_timestamp;
use rand::Rng;
use serde::Serialize;
use strum::VariantArray;

use crate::models::{accumulate, any_variant, sticky_variant, WalkSpec};

pub const SOC: WalkSpec = WalkSpec::new(20.0, 95.0, 0.5, 1);
pub const REMAINING_CAPACITY: WalkSpec = WalkSpec::new(40.0, 60.0, 1.0, 1);
pub const NOMINAL_CAPACITY: WalkSpec = WalkSpec::new(60.0, 80.0, 1.0, 1);
pub const CHARGE_RATE: WalkSpec = WalkSpec::new(-10.0, 10.0, 1.0, 1);
pub const VOLTAGE: WalkSpec = WalkSpec::new(700.0, 850.0, 5.0, 1);
pub const CURRENT: WalkSpec = WalkSpec::new(-100.0, 100.0, 5.0, 1);
pub const TEMPERATURE: WalkSpec = WalkSpec::new(25.0, 45.0, 1.0, 1);
pub const MODULE_TEMPERATURE: WalkSpec = WalkSpec::new(24.0, 30.0, 0.5, 1);
pub const EFFICIENCY: WalkSpec = WalkSpec::new(90.0, 99.0, 0.5, 1);

pub const MODULE_COUNT: usize = 3;
pub const HEALTH_CHANGE_PROBABILITY: f64 = 0.05;
pub const CYCLE_COUNT_START: std::ops::RangeInclusive<u64> = 1_000..=1_500;
pub const CYCLE_COUNT_MAX_INCREMENT: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, VariantArray)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Battery management system reading body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryTelemetry {
    pub soc: f64,
    pub remaining_capacity: f64,
    pub nominal_capacity: f64,
    pub charge_rate: f64,
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub module_temperatures: Vec<f64>,
    pub health_status: HealthStatus,
    pub efficiency: f64,
    pub cycle_count: u64,
    pub alarms: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(with = "capture_timestamp")]
    pub last_maintenance: NaiveDateTime,
}

impl BatteryTelemetry {
    /// Cold start: every field drawn from its full envelope.
    pub fn initialize<R: Rng + ?Sized>(rng: &mut R, now: NaiveDateTime) -> Self {
        Self {
            soc: SOC.initial(rng),
            remaining_capacity: REMAINING_CAPACITY.initial(rng),
            nominal_capacity: NOMINAL_CAPACITY.initial(rng),
            charge_rate: CHARGE_RATE.initial(rng),
            voltage: VOLTAGE.initial(rng),
            current: CURRENT.initial(rng),
            temperature: TEMPERATURE.initial(rng),
            module_temperatures: (0..MODULE_COUNT)
                .map(|_| MODULE_TEMPERATURE.initial(rng))
                .collect(),
            health_status: any_variant(rng),
            efficiency: EFFICIENCY.initial(rng),
            cycle_count: rng.gen_range(CYCLE_COUNT_START),
            alarms: Vec::new(),
            warnings: Vec::new(),
            last_maintenance: now,
        }
    }

    /// Next tick from the previous reading. Alarms, warnings and the
    /// maintenance date are carried through untouched.
    pub fn evolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        Self {
            soc: SOC.step(rng, self.soc),
            remaining_capacity: REMAINING_CAPACITY.step(rng, self.remaining_capacity),
            nominal_capacity: NOMINAL_CAPACITY.step(rng, self.nominal_capacity),
            charge_rate: CHARGE_RATE.step(rng, self.charge_rate),
            voltage: VOLTAGE.step(rng, self.voltage),
            current: CURRENT.step(rng, self.current),
            temperature: TEMPERATURE.step(rng, self.temperature),
            module_temperatures: self
                .module_temperatures
                .iter()
                .map(|t| MODULE_TEMPERATURE.step(rng, *t))
                .collect(),
            health_status: sticky_variant(rng, self.health_status, HEALTH_CHANGE_PROBABILITY),
            efficiency: EFFICIENCY.step(rng, self.efficiency),
            cycle_count: accumulate(rng, self.cycle_count, CYCLE_COUNT_MAX_INCREMENT),
            alarms: self.alarms.clone(),
            warnings: self.warnings.clone(),
            last_maintenance: self.last_maintenance,
        }
    }
}
