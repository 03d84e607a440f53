//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Topic naming and payload encoding for telemetry publications."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Messaging primitives for the telemetry generator.
//!
//! Topics follow `<namespace>/site<N>/<segment>/<NNN>` and payloads are the
//! JSON encoding of a reading. [`Publication`] pairs the two and is the unit
//! every transport moves.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while preparing a publication.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The payload could not be encoded as JSON.
    #[error("failed to encode payload for {topic}: {source}")]
    Encode {
        /// Topic the payload was destined for.
        topic: String,
        /// Underlying serializer failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Build the deterministic topic for one device.
///
/// `instance` is zero-padded to three digits, so `("ecogrid", 4, "bms", 2)`
/// yields `ecogrid/site4/bms/002`.
pub fn telemetry_topic(namespace: &str, site_id: u32, segment: &str, instance: u16) -> String {
    format!("{}/site{}/{}/{:03}", namespace, site_id, segment, instance)
}

/// One message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Destination topic.
    pub topic: String,
    /// Encoded payload bytes.
    pub payload: Bytes,
}

impl Publication {
    /// Encode `body` as JSON and address it to `topic`.
    pub fn encode<T: Serialize>(topic: String, body: &T) -> Result<Self, MessagingError> {
        match serde_json::to_vec(body) {
            Ok(bytes) => Ok(Self {
                topic,
                payload: Bytes::from(bytes),
            }),
            Err(source) => Err(MessagingError::Encode { topic, source }),
        }
    }

    /// Payload as UTF-8 text, if it is valid.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
