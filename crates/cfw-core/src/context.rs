//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Daemon context, handler registry, and dispatch loop."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::sync::Arc;

use cfw_bus::{ReportPublisher, Reporter};

/// Explicit daemon context handed to each service at construction.
///
/// Replaces the module-level bus handles of earlier daemon generations:
/// services publish through the reporter they were given and own nothing
/// global.
#[derive(Clone)]
pub struct DaemonContext {
    reporter: Reporter,
}

impl DaemonContext {
    /// Build a context around the outbound half of the bus.
    pub fn new(publisher: Arc<dyn ReportPublisher>) -> Self {
        Self {
            reporter: Reporter::new(publisher),
        }
    }

    /// Reporter handle for a service to keep.
    pub fn reporter(&self) -> Reporter {
        self.reporter.clone()
    }
}
