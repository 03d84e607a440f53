//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "EV charging station telemetry model."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use rand::Rng;
use serde::Serialize;
use strum::VariantArray;

use crate::models::{accumulate, any_variant, round_to, sticky_variant, WalkSpec};

pub const ACTIVE_SESSIONS: WalkSpec = WalkSpec::new(0.0, 3.0, 1.0, 0);
pub const POWER_DELIVERED: WalkSpec = WalkSpec::new(50.0, 150.0, 5.0, 1);
pub const ENERGY_DELIVERED: WalkSpec = WalkSpec::new(100.0, 300.0, 10.0, 1);
pub const REVENUE: WalkSpec = WalkSpec::new(50.0, 100.0, 2.0, 2);
pub const AVG_SESSION_DURATION: WalkSpec = WalkSpec::new(20.0, 60.0, 2.0, 1);
pub const UTILIZATION_RATE: WalkSpec = WalkSpec::new(0.0, 100.0, 5.0, 1);
pub const FAULTS: WalkSpec = WalkSpec::new(0.0, 2.0, 1.0, 0);
pub const UPTIME: WalkSpec = WalkSpec::new(95.0, 99.0, 0.2, 1);

pub const CONNECTOR_POWER: WalkSpec = WalkSpec::new(20.0, 50.0, 2.0, 1);
pub const CONNECTOR_SESSION_DURATION: WalkSpec = WalkSpec::new(10.0, 40.0, 2.0, 1);
pub const CONNECTOR_ENERGY: WalkSpec = WalkSpec::new(5.0, 25.0, 1.0, 1);

pub const CONNECTOR_COUNT: std::ops::RangeInclusive<usize> = 1..=3;
pub const SESSION_ID_RANGE: std::ops::RangeInclusive<u32> = 1_000..=9_999;
pub const TOTAL_SESSIONS_MAX_INCREMENT: u64 = 2;
pub const CONNECTOR_CHANGE_PROBABILITY: f64 = 0.02;
pub const PAYMENT_CHANGE_PROBABILITY: f64 = 0.01;
/// Session capacity used to derive the cold-start utilisation rate.
pub const SESSION_CAPACITY: f64 = 10.0;
pub const CONNECTOR_TYPE: &str = "CCS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, VariantArray)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorStatus {
    Available,
    Occupied,
    Charging,
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, VariantArray)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSystemStatus {
    Online,
    Offline,
}

/// One charging connector. Session id and connector type never change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorReading {
    pub charger_id: String,
    pub status: ConnectorStatus,
    pub session_id: String,
    pub power_output: f64,
    pub session_duration: f64,
    pub energy_delivered: f64,
    pub connector_type: String,
}

impl ConnectorReading {
    fn initialize<R: Rng + ?Sized>(rng: &mut R, index: usize) -> Self {
        Self {
            charger_id: format!("CHG{}", index + 1),
            status: ConnectorStatus::Charging,
            session_id: format!("SID{}", rng.gen_range(SESSION_ID_RANGE)),
            power_output: CONNECTOR_POWER.initial(rng),
            session_duration: CONNECTOR_SESSION_DURATION.initial(rng),
            energy_delivered: CONNECTOR_ENERGY.initial(rng),
            connector_type: CONNECTOR_TYPE.to_owned(),
        }
    }

    fn evolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        Self {
            charger_id: self.charger_id.clone(),
            status: sticky_variant(rng, self.status, CONNECTOR_CHANGE_PROBABILITY),
            session_id: self.session_id.clone(),
            power_output: CONNECTOR_POWER.step(rng, self.power_output),
            session_duration: CONNECTOR_SESSION_DURATION.step(rng, self.session_duration),
            energy_delivered: CONNECTOR_ENERGY.step(rng, self.energy_delivered),
            connector_type: self.connector_type.clone(),
        }
    }
}

/// EV charging station reading body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvChargerTelemetry {
    pub active_sessions: u32,
    pub total_sessions: u64,
    pub power_delivered: f64,
    pub energy_delivered: f64,
    pub charger_data: Vec<ConnectorReading>,
    pub revenue: f64,
    pub avg_session_duration: f64,
    pub utilization_rate: f64,
    pub network_connectivity: bool,
    pub payment_system_status: PaymentSystemStatus,
    pub faults: u32,
    pub uptime: f64,
}

impl EvChargerTelemetry {
    pub fn initialize<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let active_sessions: u32 = rng.gen_range(0..=ACTIVE_SESSIONS.max as u32);
        let total_sessions = accumulate(rng, u64::from(active_sessions), TOTAL_SESSIONS_MAX_INCREMENT);
        let power_delivered = POWER_DELIVERED.initial(rng);
        let energy_delivered = ENERGY_DELIVERED.initial(rng);
        let connectors = rng.gen_range(CONNECTOR_COUNT);
        Self {
            active_sessions,
            total_sessions,
            power_delivered,
            energy_delivered,
            charger_data: (0..connectors)
                .map(|i| ConnectorReading::initialize(rng, i))
                .collect(),
            revenue: REVENUE.initial(rng),
            avg_session_duration: AVG_SESSION_DURATION.initial(rng),
            utilization_rate: round_to(
                f64::from(active_sessions) / SESSION_CAPACITY * 100.0,
                UTILIZATION_RATE.precision,
            ),
            network_connectivity: true,
            payment_system_status: any_variant(rng),
            faults: rng.gen_range(0..=FAULTS.max as u32),
            uptime: UPTIME.initial(rng),
        }
    }

    /// Next tick. `total_sessions` only grows and never falls below the
    /// active count.
    pub fn evolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let active_sessions = ACTIVE_SESSIONS.step_count(rng, self.active_sessions);
        let total_sessions = accumulate(rng, self.total_sessions, TOTAL_SESSIONS_MAX_INCREMENT)
            .max(u64::from(active_sessions));
        Self {
            active_sessions,
            total_sessions,
            power_delivered: POWER_DELIVERED.step(rng, self.power_delivered),
            energy_delivered: ENERGY_DELIVERED.step(rng, self.energy_delivered),
            charger_data: self.charger_data.iter().map(|c| c.evolve(rng)).collect(),
            revenue: REVENUE.step(rng, self.revenue),
            avg_session_duration: AVG_SESSION_DURATION.step(rng, self.avg_session_duration),
            utilization_rate: UTILIZATION_RATE.step(rng, self.utilization_rate),
            network_connectivity: self.network_connectivity,
            payment_system_status: sticky_variant(
                rng,
                self.payment_system_status,
                PAYMENT_CHANGE_PROBABILITY,
            ),
            faults: FAULTS.step_count(rng, self.faults),
            uptime: UPTIME.step(rng, self.uptime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn within_step(spec: WalkSpec, before: f64, after: f64) -> bool {
        spec.contains(after) && (after - before).abs() <= spec.max_step + EPS
    }

    #[test]
    fn cold_start_matches_envelopes() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..500 {
            let reading = EvChargerTelemetry::initialize(&mut rng);
            assert!(reading.active_sessions <= 3);
            assert!(reading.total_sessions >= u64::from(reading.active_sessions));
            assert!(reading.total_sessions <= u64::from(reading.active_sessions) + 2);
            assert_eq!(
                reading.utilization_rate,
                f64::from(reading.active_sessions) * 10.0
            );
            assert!(reading.network_connectivity);
            assert!(reading.faults <= 2);
            assert!(CONNECTOR_COUNT.contains(&reading.charger_data.len()));
            for (i, connector) in reading.charger_data.iter().enumerate() {
                assert_eq!(connector.charger_id, format!("CHG{}", i + 1));
                assert_eq!(connector.status, ConnectorStatus::Charging);
                assert_eq!(connector.connector_type, "CCS");
                let sid: u32 = connector.session_id[3..].parse().expect("numeric session id");
                assert!(SESSION_ID_RANGE.contains(&sid));
            }
        }
    }

    #[test]
    fn totals_are_monotonic() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut reading = EvChargerTelemetry::initialize(&mut rng);
        for _ in 0..2_000 {
            let next = reading.evolve(&mut rng);
            assert!(next.total_sessions >= reading.total_sessions);
            assert!(next.total_sessions >= u64::from(next.active_sessions));
            assert!(next.active_sessions.abs_diff(reading.active_sessions) <= 1);
            assert!(next.faults <= 2);
            assert!(UTILIZATION_RATE.contains(next.utilization_rate));
            assert!(REVENUE.contains(next.revenue));
            reading = next;
        }
    }

    #[test]
    fn evolution_is_bounded_per_tick() {
        let mut rng = StdRng::seed_from_u64(25);
        let mut previous = EvChargerTelemetry::initialize(&mut rng);
        for _ in 0..1_000 {
            let next = previous.evolve(&mut rng);
            assert!(within_step(POWER_DELIVERED, previous.power_delivered, next.power_delivered));
            assert!(within_step(ENERGY_DELIVERED, previous.energy_delivered, next.energy_delivered));
            assert!(within_step(REVENUE, previous.revenue, next.revenue));
            assert!(within_step(
                AVG_SESSION_DURATION,
                previous.avg_session_duration,
                next.avg_session_duration
            ));
            assert!(within_step(UTILIZATION_RATE, previous.utilization_rate, next.utilization_rate));
            assert!(within_step(UPTIME, previous.uptime, next.uptime));
            assert!(within_step(
                ACTIVE_SESSIONS,
                f64::from(previous.active_sessions),
                f64::from(next.active_sessions)
            ));
            assert!(within_step(FAULTS, f64::from(previous.faults), f64::from(next.faults)));
            assert!(next.total_sessions - previous.total_sessions <= TOTAL_SESSIONS_MAX_INCREMENT);
            for (before, after) in previous.charger_data.iter().zip(&next.charger_data) {
                assert!(within_step(CONNECTOR_POWER, before.power_output, after.power_output));
                assert!(within_step(
                    CONNECTOR_SESSION_DURATION,
                    before.session_duration,
                    after.session_duration
                ));
                assert!(within_step(CONNECTOR_ENERGY, before.energy_delivered, after.energy_delivered));
            }
            previous = next;
        }
    }

    #[test]
    fn held_fields_never_change() {
        let mut rng = StdRng::seed_from_u64(23);
        let first = EvChargerTelemetry::initialize(&mut rng);
        let mut reading = first.clone();
        for _ in 0..500 {
            reading = reading.evolve(&mut rng);
            assert_eq!(reading.network_connectivity, first.network_connectivity);
            assert_eq!(reading.charger_data.len(), first.charger_data.len());
            for (now, then) in reading.charger_data.iter().zip(&first.charger_data) {
                assert_eq!(now.charger_id, then.charger_id);
                assert_eq!(now.session_id, then.session_id);
                assert_eq!(now.connector_type, then.connector_type);
            }
        }
    }

    #[test]
    fn serializes_integer_counters() {
        let mut rng = StdRng::seed_from_u64(24);
        let reading = EvChargerTelemetry::initialize(&mut rng);
        let json = serde_json::to_value(&reading).expect("serialize");
        assert!(json["activeSessions"].is_u64());
        assert!(json["totalSessions"].is_u64());
        assert!(json["faults"].is_u64());
        assert!(json["networkConnectivity"].is_boolean());
        assert!(json["chargerData"][0]["sessionId"].as_str().is_some());
        let status = json["paymentSystemStatus"].as_str().expect("string");
        assert!(status == "ONLINE" || status == "OFFLINE");
    }
}
