//! ---
//! cfw_section: "02-messaging-bus"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Bus transport seam and report emitter."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::sync::Arc;

use tracing::debug;

use cfw_msg::Report;

use crate::{ReportPublisher, Result};

/// Thin serializing wrapper over the report publisher.
///
/// Services hold a clone of this instead of reaching for any shared bus
/// handle; it is the only path through which outbound messages leave the
/// daemon.
#[derive(Clone)]
pub struct Reporter {
    publisher: Arc<dyn ReportPublisher>,
}

impl Reporter {
    /// Wrap a publisher.
    pub fn new(publisher: Arc<dyn ReportPublisher>) -> Self {
        Self { publisher }
    }

    /// Serialize and publish a report.
    pub async fn send(&self, report: Report) -> Result<()> {
        let payload = serde_json::to_string(&report)?;
        debug!(key = %report.key(), "publishing report");
        self.publisher.publish(payload).await
    }
}
