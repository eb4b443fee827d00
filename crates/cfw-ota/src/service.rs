//! ---
//! cfw_section: "04-ota-updates"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Firmware update checker for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use cfw_bus::Reporter;
use cfw_core::{DaemonContext, Service};
use cfw_msg::{OtaRequest, Report, RequestObject, ServiceKey};

use crate::OtaChecker;

/// Bus-facing update service.
pub struct OtaService {
    checker: OtaChecker,
    reporter: Reporter,
}

impl OtaService {
    /// Wrap a checker.
    pub fn new(ctx: &DaemonContext, checker: OtaChecker) -> Self {
        Self {
            checker,
            reporter: ctx.reporter(),
        }
    }

    /// One check at daemon start, before the dispatch loop runs, so the
    /// rest of the system hears a status without having to ask.
    pub async fn startup_check(&mut self) -> anyhow::Result<()> {
        self.checker.check().await;
        self.publish_status().await
    }

    async fn publish_status(&self) -> anyhow::Result<()> {
        self.reporter
            .send(Report::Ota(self.checker.status().to_report()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Service for OtaService {
    fn key(&self) -> ServiceKey {
        ServiceKey::Ota
    }

    async fn handle(&mut self, request: &RequestObject) -> anyhow::Result<()> {
        let sub = request
            .get(self.key().as_str())
            .cloned()
            .unwrap_or(JsonValue::Null);
        let parsed: OtaRequest = serde_json::from_value(sub)?;

        if parsed.check {
            self.checker.check().await;
        }
        // Status query, disabled feature, and completed check all answer
        // with the full current record.
        self.publish_status().await
    }
}
