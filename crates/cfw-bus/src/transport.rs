//! ---
//! cfw_section: "02-messaging-bus"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Bus transport seam and report emitter."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::debug;

use cfw_msg::{REPORT_TOPIC, REQUEST_TOPIC};

use crate::{BusError, Result};

/// Inbound side of the bus: a blocking, ordered, one-at-a-time subscription.
#[async_trait]
pub trait RequestSource: Send {
    /// Receive the next raw payload, waiting until one arrives.
    async fn recv(&mut self) -> Result<String>;
}

/// Outbound side of the bus.
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    /// Publish a serialized payload on the report topic.
    async fn publish(&self, payload: String) -> Result<()>;
}

/// Handle used to feed requests into an in-memory source.
#[derive(Clone)]
pub struct RequestInjector {
    tx: mpsc::UnboundedSender<String>,
}

impl RequestInjector {
    /// Queue a raw payload for the paired source.
    pub fn inject(&self, payload: impl Into<String>) -> Result<()> {
        self.tx
            .send(payload.into())
            .map_err(|_| BusError::Closed)
    }
}

/// In-memory request source, primarily for tests and single-process
/// integration.
pub struct InMemoryRequestSource {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a connected injector/source pair.
pub fn in_memory_pair() -> (RequestInjector, InMemoryRequestSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RequestInjector { tx }, InMemoryRequestSource { rx })
}

#[async_trait]
impl RequestSource for InMemoryRequestSource {
    async fn recv(&mut self) -> Result<String> {
        self.rx.recv().await.ok_or(BusError::Closed)
    }
}

/// Publisher that retains every payload it is handed, for assertions.
#[derive(Clone, Default)]
pub struct CollectingPublisher {
    published: Arc<Mutex<Vec<String>>>,
}

impl CollectingPublisher {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything published so far.
    pub fn take(&self) -> Vec<String> {
        let mut guard = self.published.lock().expect("publisher poisoned");
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl ReportPublisher for CollectingPublisher {
    async fn publish(&self, payload: String) -> Result<()> {
        let mut guard = self.published.lock().expect("publisher poisoned");
        guard.push(payload);
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    cmd: &'a str,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a str>,
}

#[derive(Deserialize)]
struct InboundFrame {
    #[allow(dead_code)]
    topic: String,
    payload: String,
}

/// Client for the on-device bus bridge: one Unix stream, NDJSON frames.
///
/// The bridge itself (topic fan-out, delivery) is part of the firmware image
/// and outside this daemon; this is only the subscriber/publisher client.
pub struct UnixBus;

impl UnixBus {
    /// Connect to the bridge socket, subscribe to the request topic, and
    /// return the two halves of the session.
    pub async fn connect(socket: &Path) -> Result<(UnixRequestSource, UnixReportPublisher)> {
        let stream = UnixStream::connect(socket).await?;
        let (read, mut write) = stream.into_split();

        let subscribe = serde_json::to_string(&OutboundFrame {
            cmd: "subscribe",
            topic: REQUEST_TOPIC,
            payload: None,
        })?;
        write.write_all(subscribe.as_bytes()).await?;
        write.write_all(b"\n").await?;
        debug!(socket = %socket.display(), topic = REQUEST_TOPIC, "subscribed to bus bridge");

        Ok((
            UnixRequestSource {
                reader: BufReader::new(read),
                line: String::new(),
            },
            UnixReportPublisher {
                write: tokio::sync::Mutex::new(write),
            },
        ))
    }
}

/// Request source backed by the bridge socket.
pub struct UnixRequestSource {
    reader: BufReader<OwnedReadHalf>,
    line: String,
}

#[async_trait]
impl RequestSource for UnixRequestSource {
    async fn recv(&mut self) -> Result<String> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Err(BusError::Closed);
            }
            let trimmed = self.line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let frame: InboundFrame = serde_json::from_str(trimmed)?;
            return Ok(frame.payload);
        }
    }
}

/// Report publisher backed by the bridge socket.
pub struct UnixReportPublisher {
    write: tokio::sync::Mutex<OwnedWriteHalf>,
}

#[async_trait]
impl ReportPublisher for UnixReportPublisher {
    async fn publish(&self, payload: String) -> Result<()> {
        let frame = serde_json::to_string(&OutboundFrame {
            cmd: "publish",
            topic: REPORT_TOPIC,
            payload: Some(&payload),
        })?;
        let mut guard = self.write.lock().await;
        guard.write_all(frame.as_bytes()).await?;
        guard.write_all(b"\n").await?;
        Ok(())
    }
}
