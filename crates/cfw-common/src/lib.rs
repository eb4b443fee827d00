//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Shared primitives for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod buildinfo;
pub mod logging;
pub mod serial;

pub use buildinfo::BuildInfo;
pub use logging::{init_tracing, LogFormat};
pub use serial::device_serial;
