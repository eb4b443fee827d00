//! ---
//! cfw_section: "02-messaging-bus"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Bus transport seam and report emitter."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod reporter;
pub mod transport;

/// Shared result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised by bus transports and the report emitter.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Wrapper for IO errors on the bridge socket.
    #[error("bus io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for frame serialization problems.
    #[error("bus frame error: {0}")]
    Json(#[from] serde_json::Error),
    /// The inbound subscription was closed by the peer.
    #[error("bus subscription closed")]
    Closed,
}

pub use reporter::Reporter;
pub use transport::{
    in_memory_pair, CollectingPublisher, InMemoryRequestSource, ReportPublisher, RequestInjector,
    RequestSource, UnixBus,
};
