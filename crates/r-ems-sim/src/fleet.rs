//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Device identity, per-site layout, and the device catalog."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::net::Ipv4Addr;

use r_ems_common::config::{DeviceKindConfig, DeviceSlotConfig, FleetConfig};
use r_ems_messaging::telemetry_topic;
use serde::Serialize;

/// The three simulated device classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    Battery,
    SolarArray,
    EvCharger,
}

impl DeviceKind {
    /// Topic segment and label prefix.
    pub const fn segment(self) -> &'static str {
        match self {
            DeviceKind::Battery => "bms",
            DeviceKind::SolarArray => "solar",
            DeviceKind::EvCharger => "ev",
        }
    }

    /// Device-type name used by the relational catalog.
    pub const fn catalog_type(self) -> &'static str {
        match self {
            DeviceKind::Battery => "BMS",
            DeviceKind::SolarArray => "SOLAR_ARRAY",
            DeviceKind::EvCharger => "EV_CHARGER",
        }
    }

    fn display_name(self, instance: u16) -> String {
        match self {
            DeviceKind::Battery => format!("Battery Management System {}", instance),
            DeviceKind::SolarArray if instance == 1 => "Solar Array System".to_owned(),
            DeviceKind::SolarArray => format!("Solar Array System {}", instance),
            DeviceKind::EvCharger if instance == 1 => "EV Charging Station".to_owned(),
            DeviceKind::EvCharger => format!("EV Charging Station {}", instance),
        }
    }
}

impl From<DeviceKindConfig> for DeviceKind {
    fn from(value: DeviceKindConfig) -> Self {
        match value {
            DeviceKindConfig::Battery => DeviceKind::Battery,
            DeviceKindConfig::SolarArray => DeviceKind::SolarArray,
            DeviceKindConfig::EvCharger => DeviceKind::EvCharger,
        }
    }
}

/// One device position within a site: its class and instance number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceClass {
    pub kind: DeviceKind,
    pub instance: u16,
}

impl DeviceClass {
    pub const fn new(kind: DeviceKind, instance: u16) -> Self {
        Self { kind, instance }
    }

    /// Short label such as `bms2` or `ev1`.
    pub fn label(&self) -> String {
        format!("{}{}", self.kind.segment(), self.instance)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.segment(), self.instance)
    }
}

impl From<DeviceSlotConfig> for DeviceClass {
    fn from(value: DeviceSlotConfig) -> Self {
        Self::new(value.kind.into(), value.instance)
    }
}

/// Identity of one simulated device's evolving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub site_id: u32,
    pub class: DeviceClass,
}

impl DeviceKey {
    pub const fn new(site_id: u32, class: DeviceClass) -> Self {
        Self { site_id, class }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site{}/{}", self.site_id, self.class)
    }
}

/// A device as scheduled: its key, its 1-based position in the site layout and
/// the fleet-wide numeric identifier derived from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetDevice {
    pub key: DeviceKey,
    pub ordinal: u32,
    pub device_id: u32,
}

/// Fixed per-site device layout, in publish order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetLayout {
    slots: Vec<DeviceClass>,
}

impl Default for FleetLayout {
    fn default() -> Self {
        Self {
            slots: vec![
                DeviceClass::new(DeviceKind::Battery, 1),
                DeviceClass::new(DeviceKind::Battery, 2),
                DeviceClass::new(DeviceKind::SolarArray, 1),
                DeviceClass::new(DeviceKind::EvCharger, 1),
            ],
        }
    }
}

impl FleetLayout {
    pub fn new(slots: Vec<DeviceClass>) -> Self {
        Self { slots }
    }

    pub fn from_config(config: &FleetConfig) -> Self {
        Self::new(config.devices.iter().copied().map(DeviceClass::from).collect())
    }

    pub fn slots(&self) -> &[DeviceClass] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `(site_id - 1) * layout_len + ordinal`, so ids are dense and stable.
    /// `None` for site 0 or when the id does not fit a `u32`.
    pub fn device_id(&self, site_id: u32, ordinal: u32) -> Option<u32> {
        let per_site = u32::try_from(self.slots.len()).ok()?;
        site_id
            .checked_sub(1)?
            .checked_mul(per_site)?
            .checked_add(ordinal)
    }

    /// Devices of one site in layout order. Iteration stops at the first
    /// device whose id is not representable; validated fleets never get there.
    pub fn site_devices(&self, site_id: u32) -> impl Iterator<Item = FleetDevice> + '_ {
        self.slots.iter().zip(1u32..).map_while(move |(class, ordinal)| {
            Some(FleetDevice {
                key: DeviceKey::new(site_id, *class),
                ordinal,
                device_id: self.device_id(site_id, ordinal)?,
            })
        })
    }

    /// Every device of a fleet of `sites` sites, site ascending then layout order.
    pub fn devices(&self, sites: u32) -> impl Iterator<Item = FleetDevice> + '_ {
        (1..=sites).flat_map(move |site_id| self.site_devices(site_id))
    }
}

/// Fixture record describing one device as the relational catalog stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub device_id: u32,
    pub site_id: u32,
    pub serial_number: String,
    pub name: String,
    pub description: String,
    pub device_type: &'static str,
    pub mqtt_topic: String,
    /// `None` once the site number no longer fits an IPv4 octet.
    pub ip_address: Option<Ipv4Addr>,
    /// `00:1B:44:<id hi>:<id lo>:A1`. Unique up to `MAX_FLEET_DEVICES`.
    pub mac_address: String,
}

impl DeviceDescriptor {
    pub fn describe(namespace: &str, device: &FleetDevice) -> Self {
        let DeviceKey { site_id, class } = device.key;
        let name = class.kind.display_name(class.instance);
        let ip_address = u8::try_from(site_id)
            .ok()
            .zip(u8::try_from(100 + device.ordinal).ok())
            .map(|(site, host)| Ipv4Addr::new(192, 168, site, host));
        let [_, _, id_hi, id_lo] = device.device_id.to_be_bytes();
        Self {
            device_id: device.device_id,
            site_id,
            serial_number: format!(
                "{}-SITE{}-{:03}",
                class.kind.segment().to_uppercase(),
                site_id,
                class.instance
            ),
            description: format!("{} for site {}", name, site_id),
            name,
            device_type: class.kind.catalog_type(),
            mqtt_topic: telemetry_topic(namespace, site_id, class.kind.segment(), class.instance),
            ip_address,
            mac_address: format!("00:1B:44:{:02X}:{:02X}:A1", id_hi, id_lo),
        }
    }
}

/// Catalog of every device the generator will publish for.
pub fn device_catalog(config: &FleetConfig) -> Vec<DeviceDescriptor> {
    let layout = FleetLayout::from_config(config);
    layout
        .devices(config.sites)
        .map(|device| DeviceDescriptor::describe(&config.namespace, &device))
        .collect()
}
