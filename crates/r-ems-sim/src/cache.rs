//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Last-emitted state per simulated device."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;

use crate::fleet::DeviceKey;
use crate::reading::Telemetry;

/// Last-write-wins store of the most recent telemetry body per device.
///
/// No eviction: the fleet is fixed at startup, so the map never grows past
/// one entry per scheduled device. Mutation needs `&mut self`, which gives the
/// single-writer-per-key guarantee for free.
#[derive(Debug, Default, Clone)]
pub struct DeviceStateCache {
    entries: HashMap<DeviceKey, Telemetry>,
}

impl DeviceStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &DeviceKey) -> Option<&Telemetry> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: DeviceKey, state: Telemetry) {
        self.entries.insert(key, state);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ev_charger::EvChargerTelemetry;
    use crate::fleet::{DeviceClass, DeviceKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn put_overwrites_previous_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let key = DeviceKey::new(2, DeviceClass::new(DeviceKind::EvCharger, 1));
        let mut cache = DeviceStateCache::new();
        assert!(cache.get(&key).is_none());

        let first = EvChargerTelemetry::initialize(&mut rng);
        let second = first.evolve(&mut rng);
        cache.put(key, Telemetry::EvCharger(first));
        cache.put(key, Telemetry::EvCharger(second.clone()));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), Some(&Telemetry::EvCharger(second)));
    }

    #[test]
    fn keys_are_site_scoped() {
        let mut rng = StdRng::seed_from_u64(2);
        let class = DeviceClass::new(DeviceKind::EvCharger, 1);
        let mut cache = DeviceStateCache::with_capacity(2);
        cache.put(DeviceKey::new(1, class), Telemetry::EvCharger(EvChargerTelemetry::initialize(&mut rng)));
        assert!(cache.get(&DeviceKey::new(2, class)).is_none());
        assert!(!cache.is_empty());
    }
}
