//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Daemon context, handler registry, and dispatch loop."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod context;
pub mod dispatch;

/// Shared result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while assembling or running the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Two services tried to claim the same request key.
    #[error("handler key '{0}' registered twice")]
    DuplicateKey(&'static str),
    /// The inbound subscription failed in a way the loop cannot absorb.
    #[error("bus failure: {0}")]
    Bus(#[from] cfw_bus::BusError),
}

pub use context::DaemonContext;
pub use dispatch::{Dispatcher, Service};
