//! ---
//! cfw_section: "03-settings-persistence"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Persistent per-device settings store with legacy migration."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use cfw_bus::Reporter;
use cfw_core::{DaemonContext, Service};
use cfw_msg::{Report, RequestObject, ServiceKey, SettingsChanges, SettingsRequest};

use crate::store::{OpenedStore, SettingsStore};

/// Bus-facing settings service.
///
/// Owns the store; the dispatcher is the only caller, so no locking is
/// involved anywhere in the mutation path.
pub struct SettingsService {
    store: SettingsStore,
    reporter: Reporter,
}

impl SettingsService {
    /// Wrap an opened store. When the store was just created, the full
    /// migrated document is announced on the bus before any request is
    /// served, so direct readers and bus listeners start from the same
    /// state.
    pub async fn start(ctx: &DaemonContext, opened: OpenedStore) -> anyhow::Result<Self> {
        let reporter = ctx.reporter();
        if let Some(document) = opened.created {
            reporter
                .send(Report::Settings(SettingsChanges { changes: document }))
                .await?;
        }
        Ok(Self {
            store: opened.store,
            reporter,
        })
    }

    /// Read access for tests and startup wiring.
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }
}

#[async_trait]
impl Service for SettingsService {
    fn key(&self) -> ServiceKey {
        ServiceKey::Settings
    }

    async fn handle(&mut self, request: &RequestObject) -> anyhow::Result<()> {
        // Presence of the key is guaranteed by the dispatcher; the shape of
        // the value is not.
        let sub = request
            .get(self.key().as_str())
            .cloned()
            .unwrap_or(JsonValue::Null);
        let parsed: SettingsRequest = serde_json::from_value(sub)?;

        match parsed.set {
            Some(JsonValue::Object(set)) => {
                // Persist first: nobody may observe the change report
                // before the document is durable on disk.
                self.store.apply_set(&set)?;
                self.reporter
                    .send(Report::Settings(SettingsChanges { changes: set }))
                    .await?;
            }
            Some(other) => {
                // Observed behavior is a silent drop; no rejection report
                // goes out even though one was once documented.
                debug!(set = %other, "set request is not an object; ignoring");
            }
            None => {
                debug!("settings request carried no recognized opcode");
            }
        }
        Ok(())
    }
}
