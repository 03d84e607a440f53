//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the telemetry generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{NaiveDateTime, SubsecRound, Utc};

/// Wire format for reading timestamps: UTC, second precision, no offset suffix.
pub const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Capture the current UTC instant truncated to whole seconds.
pub fn capture_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

pub fn format_capture(at: &NaiveDateTime) -> String {
    at.format(CAPTURE_TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for capture timestamps, for use with `#[serde(with = ...)]`.
pub mod capture_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::CAPTURE_TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(CAPTURE_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, CAPTURE_TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}
