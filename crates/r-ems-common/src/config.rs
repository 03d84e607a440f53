//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the telemetry generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Highest instance number that still fits the three-digit topic suffix.
pub const MAX_DEVICE_INSTANCE: u16 = 999;

/// Largest fleet (sites times per-site devices) the generator accepts. Device
/// ids must fit the two variable octets of the catalog MAC address.
pub const MAX_FLEET_DEVICES: u64 = u16::MAX as u64;

fn default_namespace() -> String {
    "ecogrid".to_owned()
}

fn default_sites() -> u32 {
    10
}

fn default_devices() -> Vec<DeviceSlotConfig> {
    vec![
        DeviceSlotConfig::new(DeviceKindConfig::Battery, 1),
        DeviceSlotConfig::new(DeviceKindConfig::Battery, 2),
        DeviceSlotConfig::new(DeviceKindConfig::SolarArray, 1),
        DeviceSlotConfig::new(DeviceKindConfig::EvCharger, 1),
    ]
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_progress_every() -> u64 {
    30
}

fn default_site_stagger() -> Duration {
    Duration::from_millis(100)
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the telemetry generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_EMS_TELEMETRY_CONFIG";

    /// Load configuration from disk, respecting the `R_EMS_TELEMETRY_CONFIG` override.
    ///
    /// A missing file is not an error: the built-in fleet defaults apply.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Total number of simulated devices across the fleet.
    pub fn device_count(&self) -> usize {
        self.fleet.sites as usize * self.fleet.devices.len()
    }

    /// Validate structural invariants. Every violation is reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        self.fleet.collect_problems(&mut problems);
        self.cadence.collect_problems(&mut problems);
        self.transport.collect_problems(&mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "configuration rejected: {}",
                problems.join("; ")
            ))
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Shape of the simulated fleet: how many sites and which devices each carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Topic namespace prefix, e.g. `ecogrid`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Number of sites; site identifiers run `1..=sites`.
    #[serde(default = "default_sites")]
    pub sites: u32,
    /// Per-site device layout, in publish order.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceSlotConfig>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            sites: default_sites(),
            devices: default_devices(),
        }
    }
}

impl FleetConfig {
    fn collect_problems(&self, problems: &mut Vec<String>) {
        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            problems.push("fleet.namespace must not be empty".to_owned());
        } else if namespace.contains(['/', '+', '#']) {
            problems.push(format!(
                "fleet.namespace '{}' must not contain '/', '+' or '#'",
                self.namespace
            ));
        }
        if self.sites == 0 {
            problems.push("fleet.sites must be at least 1".to_owned());
        }
        if self.devices.is_empty() {
            problems.push("fleet.devices must declare at least one device".to_owned());
        }
        let devices = u64::from(self.sites) * self.devices.len() as u64;
        if devices > MAX_FLEET_DEVICES {
            problems.push(format!(
                "fleet of {} sites x {} devices ({}) exceeds the {} device limit",
                self.sites,
                self.devices.len(),
                devices,
                MAX_FLEET_DEVICES
            ));
        }
        let mut seen = HashSet::new();
        for slot in &self.devices {
            if slot.instance == 0 || slot.instance > MAX_DEVICE_INSTANCE {
                problems.push(format!(
                    "fleet.devices: {:?} instance {} outside 1..={}",
                    slot.kind, slot.instance, MAX_DEVICE_INSTANCE
                ));
            }
            if !seen.insert((slot.kind, slot.instance)) {
                problems.push(format!(
                    "fleet.devices: duplicate {:?} instance {}",
                    slot.kind, slot.instance
                ));
            }
        }
    }
}

/// One device position within a site layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeviceSlotConfig {
    pub kind: DeviceKindConfig,
    pub instance: u16,
}

impl DeviceSlotConfig {
    pub const fn new(kind: DeviceKindConfig, instance: u16) -> Self {
        Self { kind, instance }
    }
}

/// Device classes understood by the generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKindConfig {
    Battery,
    SolarArray,
    EvCharger,
}

/// Tick cadence for the publish scheduler.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Sleep between the end of one tick and the start of the next.
    #[serde(rename = "tick_interval_secs", default = "default_tick_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    /// Emit a progress log line every this many ticks.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
    /// Pause between consecutive sites within a tick. Zero disables the stagger.
    #[serde(rename = "site_stagger_ms", default = "default_site_stagger")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub site_stagger: Duration,
    /// Stop after this many ticks; `None` runs until a shutdown signal.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            progress_every: default_progress_every(),
            site_stagger: default_site_stagger(),
            max_ticks: None,
        }
    }
}

impl CadenceConfig {
    fn collect_problems(&self, problems: &mut Vec<String>) {
        if self.tick_interval.is_zero() {
            problems.push("cadence.tick_interval_secs must be greater than zero".to_owned());
        }
        if self.progress_every == 0 {
            problems.push("cadence.progress_every must be greater than zero".to_owned());
        }
        if self.max_ticks == Some(0) {
            problems.push("cadence.max_ticks must be greater than zero when set".to_owned());
        }
    }
}

/// Transport sink selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Discard every publication.
    Null,
    /// JSON lines on standard output.
    #[default]
    Stdout,
    /// JSON lines appended to `transport.path`.
    File,
    /// In-process broadcast channel.
    Broadcast,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" => Ok(TransportKind::Null),
            "stdout" => Ok(TransportKind::Stdout),
            "file" => Ok(TransportKind::File),
            "broadcast" => Ok(TransportKind::Broadcast),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            path: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl TransportConfig {
    fn collect_problems(&self, problems: &mut Vec<String>) {
        if self.kind == TransportKind::File && self.path.is_none() {
            problems.push("transport.path is required when transport.kind = \"file\"".to_owned());
        }
        if self.kind == TransportKind::Broadcast && self.channel_capacity == 0 {
            problems.push("transport.channel_capacity must be greater than zero".to_owned());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Fixed RNG seed for reproducible runs; `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Rolling log file directory. File logging is off when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
