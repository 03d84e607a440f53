//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Transport implementations for messaging layers."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Publish-side transports for telemetry.
//!
//! Publishing is fire-and-forget: a transport either accepts a message or
//! reports why it could not, and callers never retry. The broker client itself
//! lives outside this workspace; the sinks here cover local runs, pipelines
//! (`stdout`/file JSON lines) and in-process consumers.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use r_ems_messaging::Publication;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Transport failures. None of them are retried by the publisher.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing to the underlying sink failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The payload was not valid JSON and could not be framed.
    #[error("payload for {topic} is not valid JSON: {source}")]
    InvalidPayload {
        /// Topic of the rejected message.
        topic: String,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// The sink refused the message.
    #[error("publish to {topic} rejected: {reason}")]
    Rejected {
        /// Topic of the rejected message.
        topic: String,
        /// Sink-specific reason.
        reason: String,
    },
}

/// Best-effort publish boundary.
pub trait Transport: Send + Sync {
    /// Short sink name for logs.
    fn name(&self) -> &'static str;

    /// Hand one message to the sink without waiting for any acknowledgement.
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        (**self).publish(topic, payload)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        (**self).publish(topic, payload)
    }
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn name(&self) -> &'static str {
        "null"
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        tracing::trace!(topic, bytes = payload.len(), "null transport drop message");
        Ok(())
    }
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Publishing with no live subscriber is not an error; the message is simply
/// dropped, like a broker topic nobody listens to. Slow subscribers observe
/// `RecvError::Lagged` once the buffer wraps.
#[derive(Debug, Clone)]
pub struct BroadcastTransport {
    sender: broadcast::Sender<Publication>,
}

impl BroadcastTransport {
    /// `capacity` must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Publication> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Transport for BroadcastTransport {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        let publication = Publication {
            topic: topic.to_owned(),
            payload,
        };
        if self.sender.send(publication).is_err() {
            tracing::trace!(topic, "no broadcast subscribers; message dropped");
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Line<'a> {
    topic: &'a str,
    payload: serde_json::Value,
}

/// Writes one `{"topic": .., "payload": ..}` JSON object per line.
pub struct WriterTransport {
    name: &'static str,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for WriterTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterTransport").field("name", &self.name).finish()
    }
}

impl WriterTransport {
    pub fn new(name: &'static str, writer: Box<dyn Write + Send>) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new("stdout", Box::new(io::stdout()))
    }

    /// Append to `path`, creating it if needed.
    pub fn file(path: &Path) -> Result<Self, TransportError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new("file", Box::new(io::BufWriter::new(file))))
    }
}

impl Transport for WriterTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        let payload: serde_json::Value =
            serde_json::from_slice(&payload).map_err(|source| TransportError::InvalidPayload {
                topic: topic.to_owned(),
                source,
            })?;
        let mut line = serde_json::to_vec(&Line { topic, payload }).map_err(io::Error::from)?;
        line.push(b'\n');
        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn null_transport_accepts_everything() {
        let transport = NullTransport;
        assert!(transport.publish("a/site1/bms/001", Bytes::from_static(b"{}")).is_ok());
        assert_eq!(transport.name(), "null");
    }

    #[test]
    fn broadcast_delivers_in_order() {
        let transport = BroadcastTransport::new(8);
        let mut rx = transport.subscribe();
        assert_eq!(transport.subscriber_count(), 1);
        transport.publish("t/site1/bms/001", Bytes::from_static(b"1")).expect("publish");
        transport.publish("t/site1/bms/002", Bytes::from_static(b"2")).expect("publish");
        assert_eq!(rx.try_recv().expect("first").topic, "t/site1/bms/001");
        let second = rx.try_recv().expect("second");
        assert_eq!(second.topic, "t/site1/bms/002");
        assert_eq!(second.payload, Bytes::from_static(b"2"));
    }

    #[test]
    fn broadcast_without_subscribers_is_not_an_error() {
        let transport = BroadcastTransport::new(1);
        assert!(transport.publish("t/site1/ev/001", Bytes::from_static(b"{}")).is_ok());
    }

    #[test]
    fn writer_emits_json_lines() {
        let buffer = SharedBuffer::default();
        let transport = WriterTransport::new("memory", Box::new(buffer.clone()));
        transport
            .publish("ecogrid/site1/bms/001", Bytes::from_static(br#"{"deviceId":1}"#))
            .expect("publish");
        transport
            .publish("ecogrid/site1/bms/002", Bytes::from_static(br#"{"deviceId":2}"#))
            .expect("publish");
        let text = String::from_utf8(buffer.0.lock().clone()).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                r#"{"topic":"ecogrid/site1/bms/001","payload":{"deviceId":1}}"#,
                r#"{"topic":"ecogrid/site1/bms/002","payload":{"deviceId":2}}"#,
            ]
        );
    }

    #[test]
    fn writer_rejects_non_json_payload() {
        let transport = WriterTransport::new("memory", Box::new(SharedBuffer::default()));
        let err = transport
            .publish("t/site1/bms/001", Bytes::from_static(b"not json"))
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidPayload { .. }));
    }

    #[test]
    fn file_transport_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("telemetry.jsonl");
        {
            let transport = WriterTransport::file(&path).expect("open");
            transport.publish("t/site1/ev/001", Bytes::from_static(b"{}")).expect("publish");
        }
        {
            let transport = WriterTransport::file(&path).expect("reopen");
            transport.publish("t/site2/ev/001", Bytes::from_static(b"{}")).expect("publish");
        }
        let mut contents = String::new();
        std::fs::File::open(&path)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .expect("read back");
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn boxed_and_shared_transports_delegate() {
        let boxed: Box<dyn Transport> = Box::new(NullTransport);
        assert_eq!(boxed.name(), "null");
        let shared = Arc::new(BroadcastTransport::new(4));
        assert_eq!(Transport::name(&shared), "broadcast");
    }
}
