//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Solar array telemetry model."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::f64::consts::PI;

use chrono::{NaiveDateTime, Timelike};
use r_ems_common::time::capture_timestamp;
use rand::Rng;
use serde::Serialize;
use strum::VariantArray;

use crate::models::{any_variant, round_to, sticky_variant, WalkSpec};

pub const CURRENT_OUTPUT: WalkSpec = WalkSpec::new(0.0, 900.0, 10.0, 1);
pub const ENERGY_YIELD: WalkSpec = WalkSpec::new(200.0, 500.0, 10.0, 1);
pub const ENERGY_YIELD_TOTAL: WalkSpec = WalkSpec::new(10_000.0, 15_000.0, 50.0, 1);
pub const PANEL_TEMPERATURE: WalkSpec = WalkSpec::new(30.0, 55.0, 2.0, 1);
pub const AMBIENT_TEMPERATURE: WalkSpec = WalkSpec::new(20.0, 35.0, 1.0, 1);
pub const WIND_SPEED: WalkSpec = WalkSpec::new(0.0, 1.0, 0.1, 2);
pub const INVERTER_EFFICIENCY: WalkSpec = WalkSpec::new(95.0, 99.0, 0.2, 1);
pub const SYSTEM_EFFICIENCY: WalkSpec = WalkSpec::new(90.0, 99.0, 0.2, 1);
pub const PERFORMANCE_RATIO: WalkSpec = WalkSpec::new(80.0, 99.0, 0.5, 1);

pub const STRING_VOLTAGE: WalkSpec = WalkSpec::new(600.0, 650.0, 2.0, 2);
pub const STRING_CURRENT: WalkSpec = WalkSpec::new(10.0, 20.0, 1.0, 2);
pub const STRING_TEMPERATURE: WalkSpec = WalkSpec::new(30.0, 40.0, 1.0, 2);

pub const STRING_COUNT: std::ops::RangeInclusive<usize> = 1..=3;
pub const INVERTER_CHANGE_PROBABILITY: f64 = 0.05;
/// Peak of the cold-start daylight curve, reached at 12:00 UTC.
pub const DAYLIGHT_PEAK: f64 = 800.0;
/// Upper bound of the noise added on top of the daylight curve at cold start.
pub const COLD_START_NOISE: f64 = 100.0;
pub const IRRADIANCE_PER_OUTPUT: f64 = 1.2;
pub const DEFAULT_ALARMS: [&str; 2] = ["OVERVOLTAGE", "UNDERVOLTAGE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, VariantArray)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InverterStatus {
    Online,
    Offline,
    Fault,
}

/// One PV string. `power` is derived, never walked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringReading {
    pub string_id: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub temperature: f64,
}

impl StringReading {
    fn assemble(string_id: String, voltage: f64, current: f64, temperature: f64) -> Self {
        Self {
            string_id,
            voltage,
            current,
            power: string_power(voltage, current),
            temperature,
        }
    }

    fn initialize<R: Rng + ?Sized>(rng: &mut R, index: usize) -> Self {
        let voltage = STRING_VOLTAGE.initial(rng);
        let current = STRING_CURRENT.initial(rng);
        let temperature = STRING_TEMPERATURE.initial(rng);
        Self::assemble(format!("STR{}", index + 1), voltage, current, temperature)
    }

    fn evolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let voltage = STRING_VOLTAGE.step(rng, self.voltage);
        let current = STRING_CURRENT.step(rng, self.current);
        let temperature = STRING_TEMPERATURE.step(rng, self.temperature);
        Self::assemble(self.string_id.clone(), voltage, current, temperature)
    }
}

/// Solar array reading body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarTelemetry {
    pub current_output: f64,
    pub energy_yield: f64,
    pub energy_yield_total: f64,
    pub panel_temperature: f64,
    pub irradiance: f64,
    pub ambient_temperature: f64,
    pub wind_speed: f64,
    pub inverter_efficiency: f64,
    pub system_efficiency: f64,
    pub performance_ratio: f64,
    pub string_data: Vec<StringReading>,
    pub inverter_status: InverterStatus,
    pub alarms: Vec<String>,
    #[serde(with = "capture_timestamp")]
    pub last_cleaning: NaiveDateTime,
}

/// kW for a string: `voltage * current / 1000`, two decimals.
pub fn string_power(voltage: f64, current: f64) -> f64 {
    round_to(voltage * current / 1000.0, 2)
}

/// Irradiance is a pure function of output, rounded to a whole number.
pub fn irradiance(current_output: f64) -> f64 {
    (current_output * IRRADIANCE_PER_OUTPUT).round()
}

/// Half-sine over 06:00..=18:00 UTC peaking at noon, zero at night.
pub fn daylight_base_output(at: NaiveDateTime) -> f64 {
    let hour = f64::from(at.hour());
    if (6.0..=18.0).contains(&hour) {
        (DAYLIGHT_PEAK * ((hour - 6.0) * PI / 12.0).sin()).max(0.0)
    } else {
        0.0
    }
}

impl SolarTelemetry {
    /// Cold start. Output is seeded from the daylight curve at `now`; later
    /// ticks never consult the clock again.
    pub fn initialize<R: Rng + ?Sized>(rng: &mut R, now: NaiveDateTime) -> Self {
        let base = daylight_base_output(now);
        let current_output = round_to(
            (base + rng.gen_range(0.0..=COLD_START_NOISE))
                .clamp(CURRENT_OUTPUT.min, CURRENT_OUTPUT.max),
            CURRENT_OUTPUT.precision,
        );
        let strings = rng.gen_range(STRING_COUNT);
        Self {
            current_output,
            energy_yield: ENERGY_YIELD.initial(rng),
            energy_yield_total: ENERGY_YIELD_TOTAL.initial(rng),
            panel_temperature: PANEL_TEMPERATURE.initial(rng),
            irradiance: irradiance(current_output),
            ambient_temperature: AMBIENT_TEMPERATURE.initial(rng),
            wind_speed: WIND_SPEED.initial(rng),
            inverter_efficiency: INVERTER_EFFICIENCY.initial(rng),
            system_efficiency: SYSTEM_EFFICIENCY.initial(rng),
            performance_ratio: PERFORMANCE_RATIO.initial(rng),
            string_data: (0..strings).map(|i| StringReading::initialize(rng, i)).collect(),
            inverter_status: any_variant(rng),
            alarms: DEFAULT_ALARMS.iter().map(|a| (*a).to_owned()).collect(),
            last_cleaning: now,
        }
    }

    pub fn evolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let current_output = CURRENT_OUTPUT.step(rng, self.current_output);
        Self {
            current_output,
            energy_yield: ENERGY_YIELD.step(rng, self.energy_yield),
            energy_yield_total: ENERGY_YIELD_TOTAL.step(rng, self.energy_yield_total),
            panel_temperature: PANEL_TEMPERATURE.step(rng, self.panel_temperature),
            irradiance: irradiance(current_output),
            ambient_temperature: AMBIENT_TEMPERATURE.step(rng, self.ambient_temperature),
            wind_speed: WIND_SPEED.step(rng, self.wind_speed),
            inverter_efficiency: INVERTER_EFFICIENCY.step(rng, self.inverter_efficiency),
            system_efficiency: SYSTEM_EFFICIENCY.step(rng, self.system_efficiency),
            performance_ratio: PERFORMANCE_RATIO.step(rng, self.performance_ratio),
            string_data: self.string_data.iter().map(|s| s.evolve(rng)).collect(),
            inverter_status: sticky_variant(rng, self.inverter_status, INVERTER_CHANGE_PROBABILITY),
            alarms: self.alarms.clone(),
            last_cleaning: self.last_cleaning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn within_step(spec: WalkSpec, before: f64, after: f64) -> bool {
        spec.contains(after) && (after - before).abs() <= spec.max_step + EPS
    }

    fn at_hour(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 21)
            .and_then(|d| d.and_hms_opt(hour, 15, 0))
            .expect("valid time")
    }

    #[test]
    fn daylight_curve_shape() {
        assert_eq!(daylight_base_output(at_hour(3)), 0.0);
        assert_eq!(daylight_base_output(at_hour(22)), 0.0);
        assert!(daylight_base_output(at_hour(6)).abs() < 1e-9);
        assert!((daylight_base_output(at_hour(12)) - DAYLIGHT_PEAK).abs() < 1e-9);
        assert!(daylight_base_output(at_hour(9)) < daylight_base_output(at_hour(11)));
        assert!(daylight_base_output(at_hour(18)).abs() < 1e-9);
    }

    #[test]
    fn night_cold_start_stays_low() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..200 {
            let reading = SolarTelemetry::initialize(&mut rng, at_hour(2));
            assert!((0.0..=COLD_START_NOISE).contains(&reading.current_output));
        }
    }

    #[test]
    fn noon_cold_start_is_near_peak() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let reading = SolarTelemetry::initialize(&mut rng, at_hour(12));
            assert!(reading.current_output >= DAYLIGHT_PEAK);
            assert!(CURRENT_OUTPUT.contains(reading.current_output));
        }
    }

    #[test]
    fn derived_fields_hold_every_tick() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut reading = SolarTelemetry::initialize(&mut rng, at_hour(10));
        for _ in 0..1_000 {
            assert_eq!(reading.irradiance, (reading.current_output * 1.2).round());
            for string in &reading.string_data {
                assert_eq!(string.power, round_to(string.voltage * string.current / 1000.0, 2));
            }
            reading = reading.evolve(&mut rng);
        }
    }

    #[test]
    fn string_count_and_identity_are_fixed() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let first = SolarTelemetry::initialize(&mut rng, at_hour(14));
            assert!(STRING_COUNT.contains(&first.string_data.len()));
            let ids: Vec<_> = first.string_data.iter().map(|s| s.string_id.clone()).collect();
            let mut reading = first;
            for _ in 0..20 {
                reading = reading.evolve(&mut rng);
                let now: Vec<_> = reading.string_data.iter().map(|s| s.string_id.clone()).collect();
                assert_eq!(now, ids);
            }
        }
    }

    #[test]
    fn string_walks_follow_their_own_predecessor() {
        let mut rng = StdRng::seed_from_u64(12);
        let reading = SolarTelemetry::initialize(&mut rng, at_hour(14));
        let next = reading.evolve(&mut rng);
        for (before, after) in reading.string_data.iter().zip(&next.string_data) {
            assert!((after.voltage - before.voltage).abs() <= STRING_VOLTAGE.max_step + 1e-9);
            assert!((after.current - before.current).abs() <= STRING_CURRENT.max_step + 1e-9);
        }
    }

    #[test]
    fn evolution_is_bounded_per_tick() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut previous = SolarTelemetry::initialize(&mut rng, at_hour(12));
        for _ in 0..1_000 {
            let next = previous.evolve(&mut rng);
            assert!(within_step(CURRENT_OUTPUT, previous.current_output, next.current_output));
            assert!(within_step(ENERGY_YIELD, previous.energy_yield, next.energy_yield));
            assert!(within_step(ENERGY_YIELD_TOTAL, previous.energy_yield_total, next.energy_yield_total));
            assert!(within_step(PANEL_TEMPERATURE, previous.panel_temperature, next.panel_temperature));
            assert!(within_step(AMBIENT_TEMPERATURE, previous.ambient_temperature, next.ambient_temperature));
            assert!(within_step(WIND_SPEED, previous.wind_speed, next.wind_speed));
            assert!(within_step(INVERTER_EFFICIENCY, previous.inverter_efficiency, next.inverter_efficiency));
            assert!(within_step(SYSTEM_EFFICIENCY, previous.system_efficiency, next.system_efficiency));
            assert!(within_step(PERFORMANCE_RATIO, previous.performance_ratio, next.performance_ratio));
            assert_eq!(next.string_data.len(), previous.string_data.len());
            for (before, after) in previous.string_data.iter().zip(&next.string_data) {
                assert!(within_step(STRING_VOLTAGE, before.voltage, after.voltage));
                assert!(within_step(STRING_CURRENT, before.current, after.current));
                assert!(within_step(STRING_TEMPERATURE, before.temperature, after.temperature));
            }
            assert_eq!(next.alarms, previous.alarms);
            assert_eq!(next.last_cleaning, previous.last_cleaning);
            previous = next;
        }
    }

    #[test]
    fn cold_start_alarms_and_payload_names() {
        let mut rng = StdRng::seed_from_u64(13);
        let reading = SolarTelemetry::initialize(&mut rng, at_hour(7));
        assert_eq!(reading.alarms, DEFAULT_ALARMS);
        let json = serde_json::to_value(&reading).expect("serialize");
        assert!(json["stringData"][0]["stringId"].as_str() == Some("STR1"));
        assert!(json.get("energyYieldTotal").is_some());
        assert!(json.get("lastCleaning").is_some());
    }
}
