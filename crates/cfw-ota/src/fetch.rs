//! ---
//! cfw_section: "04-ota-updates"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Firmware update checker for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{Manifest, Result};

/// Published manifest location for stable firmware builds.
pub const DEFAULT_MANIFEST_URL: &str = "https://ota.cfw-project.dev/stable/manifest.json";

/// Upper bound on one manifest fetch. The check runs inline in the dispatch
/// loop, so this also bounds how long a check request can stall the daemon.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of update manifests. The HTTP implementation is the only one used
/// in production; tests substitute stubs so no check touches the network.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch and decode the current manifest.
    async fn fetch(&self) -> Result<Manifest>;
}

/// Manifest source backed by the fixed HTTPS endpoint.
pub struct HttpManifestSource {
    client: reqwest::Client,
    url: String,
}

impl HttpManifestSource {
    /// Build a source for the given manifest URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(CHECK_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch(&self) -> Result<Manifest> {
        debug!(url = %self.url, "fetching update manifest");
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let manifest: Manifest = serde_json::from_str(&body)?;
        Ok(manifest)
    }
}
