//! ---
//! cfw_section: "04-ota-updates"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Firmware update checker for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod checker;
pub mod fetch;
pub mod manifest;
pub mod service;

/// Shared result type for update-check operations.
pub type Result<T> = std::result::Result<T, OtaError>;

/// Errors raised while fetching or decoding an update manifest. All of them
/// are transient from the daemon's point of view: they mark the status
/// record and the loop carries on.
#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    /// Transport-level failure reaching the manifest endpoint.
    #[error("manifest fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with something that is not a manifest.
    #[error("manifest decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

pub use checker::{OtaChecker, OtaStatus};
pub use fetch::{HttpManifestSource, ManifestSource, DEFAULT_MANIFEST_URL};
pub use manifest::{Manifest, ManifestFile};
pub use service::OtaService;
