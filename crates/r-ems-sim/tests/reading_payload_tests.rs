//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "tests"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Payload shape and multi-tick behaviour of generated readings."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::NaiveDate;
use r_ems_sim::{generate, DeviceKind, DeviceStateCache, FleetLayout, Telemetry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid time")
}

#[test]
fn readings_serialize_flat_with_identity_first() {
    let layout = FleetLayout::default();
    let mut cache = DeviceStateCache::new();
    let mut rng = StdRng::seed_from_u64(17);

    for device in layout.site_devices(2) {
        let reading = generate(&device, &mut cache, &mut rng, noon()).expect("reading");
        let json = serde_json::to_string(&reading).expect("serialize");
        assert!(
            json.starts_with(&format!(
                "{{\"deviceId\":{},\"timestamp\":\"2024-05-01T12:00:00\",",
                device.device_id
            )),
            "{json}"
        );
        let value: Value = serde_json::from_str(&json).expect("json");
        let marker = match device.key.class.kind {
            DeviceKind::Battery => "soc",
            DeviceKind::SolarArray => "currentOutput",
            DeviceKind::EvCharger => "activeSessions",
        };
        assert!(value.get(marker).is_some(), "{marker} missing in {json}");
        assert!(value.get("Battery").is_none() && value.get("telemetry").is_none());
    }
}

#[test]
fn every_device_keeps_its_shape_across_ticks() {
    let layout = FleetLayout::default();
    let mut cache = DeviceStateCache::new();
    let mut rng = StdRng::seed_from_u64(18);
    let devices: Vec<_> = layout.devices(3).collect();

    let first: Vec<_> = devices
        .iter()
        .map(|d| generate(d, &mut cache, &mut rng, noon()).expect("first").telemetry)
        .collect();
    assert_eq!(cache.len(), devices.len());

    for _ in 0..50 {
        for (device, initial) in devices.iter().zip(&first) {
            let reading = generate(device, &mut cache, &mut rng, noon()).expect("tick");
            match (&reading.telemetry, initial) {
                (Telemetry::Battery(now), Telemetry::Battery(then)) => {
                    assert_eq!(now.module_temperatures.len(), then.module_temperatures.len());
                    assert_eq!(now.last_maintenance, then.last_maintenance);
                }
                (Telemetry::Solar(now), Telemetry::Solar(then)) => {
                    assert_eq!(now.string_data.len(), then.string_data.len());
                    assert_eq!(now.irradiance, (now.current_output * 1.2).round());
                }
                (Telemetry::EvCharger(now), Telemetry::EvCharger(then)) => {
                    assert_eq!(now.charger_data.len(), then.charger_data.len());
                    assert!(now.total_sessions >= then.total_sessions);
                }
                (now, then) => panic!("device changed class: {:?} -> {:?}", then.kind(), now.kind()),
            }
        }
    }
    assert_eq!(cache.len(), devices.len());
}
