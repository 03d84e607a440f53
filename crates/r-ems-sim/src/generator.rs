//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Cache-backed reading generation for every device class."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::battery::{BatteryTelemetry, MODULE_COUNT};
use crate::cache::DeviceStateCache;
use crate::error::{Result, SimError};
use crate::ev_charger::EvChargerTelemetry;
use crate::fleet::{DeviceKey, DeviceKind, FleetDevice};
use crate::reading::{Reading, Telemetry};
use crate::solar::SolarTelemetry;

/// Produce the next reading for `device`, consulting and then updating `cache`.
///
/// A missing cache entry means cold start. A present entry must have the shape
/// the generators always write; anything else is reported, never patched.
pub fn generate<R: Rng + ?Sized>(
    device: &FleetDevice,
    cache: &mut DeviceStateCache,
    rng: &mut R,
    now: NaiveDateTime,
) -> Result<Reading> {
    let key = device.key;
    let telemetry = match cache.get(&key) {
        Some(previous) => {
            check_shape(&key, previous)?;
            evolve(previous, rng)
        }
        None => {
            trace!(device = %key, "cold start");
            initialize(key.class.kind, rng, now)
        }
    };
    cache.put(key, telemetry.clone());
    Ok(Reading {
        device_id: device.device_id,
        timestamp: now,
        telemetry,
    })
}

fn initialize<R: Rng + ?Sized>(kind: DeviceKind, rng: &mut R, now: NaiveDateTime) -> Telemetry {
    match kind {
        DeviceKind::Battery => Telemetry::Battery(BatteryTelemetry::initialize(rng, now)),
        DeviceKind::SolarArray => Telemetry::Solar(SolarTelemetry::initialize(rng, now)),
        DeviceKind::EvCharger => Telemetry::EvCharger(EvChargerTelemetry::initialize(rng)),
    }
}

fn evolve<R: Rng + ?Sized>(previous: &Telemetry, rng: &mut R) -> Telemetry {
    match previous {
        Telemetry::Battery(state) => Telemetry::Battery(state.evolve(rng)),
        Telemetry::Solar(state) => Telemetry::Solar(state.evolve(rng)),
        Telemetry::EvCharger(state) => Telemetry::EvCharger(state.evolve(rng)),
    }
}

fn check_shape(key: &DeviceKey, cached: &Telemetry) -> Result<()> {
    let expected = key.class.kind;
    if cached.kind() != expected {
        return Err(SimError::VariantMismatch {
            key: *key,
            expected,
            found: cached.kind(),
        });
    }
    match cached {
        Telemetry::Battery(state) if state.module_temperatures.len() != MODULE_COUNT => {
            Err(SimError::SubReadingCount {
                key: *key,
                field: "moduleTemperatures",
                expected: MODULE_COUNT,
                found: state.module_temperatures.len(),
            })
        }
        Telemetry::Solar(state) if state.string_data.is_empty() => Err(SimError::EmptySubReadings {
            key: *key,
            field: "stringData",
        }),
        Telemetry::EvCharger(state) if state.charger_data.is_empty() => {
            Err(SimError::EmptySubReadings {
                key: *key,
                field: "chargerData",
            })
        }
        _ => Ok(()),
    }
}

/// Owns the device state cache and the random source for one generator run.
#[derive(Debug)]
pub struct TelemetryEngine {
    cache: DeviceStateCache,
    rng: StdRng,
}

impl TelemetryEngine {
    /// A fixed seed gives a reproducible run; `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>, expected_devices: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            cache: DeviceStateCache::with_capacity(expected_devices),
            rng,
        }
    }

    pub fn next_reading(&mut self, device: &FleetDevice, now: NaiveDateTime) -> Result<Reading> {
        generate(device, &mut self.cache, &mut self.rng, now)
    }

    pub fn cache(&self) -> &DeviceStateCache {
        &self.cache
    }

    /// Replace the cached state of one device, e.g. to resume from a snapshot.
    pub fn prime(&mut self, key: DeviceKey, state: Telemetry) {
        self.cache.put(key, state);
    }
}
