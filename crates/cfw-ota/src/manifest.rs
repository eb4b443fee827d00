//! ---
//! cfw_section: "04-ota-updates"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Firmware update checker for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Remote document describing the latest published firmware build.
///
/// Only `build_timestamp` participates in the availability decision; the
/// rest rides along into status reports so the UI can show release details
/// and hand the file list to the downloader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Human-readable version of the published build.
    pub version: String,
    /// Seconds since the epoch at which the published build was made.
    pub build_timestamp: i64,
    /// Payload files making up the update.
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    /// Optional release notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// One downloadable payload file within a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Where to fetch the file from.
    pub url: String,
    /// Expected md5 of the file contents.
    pub md5: String,
    /// Path the file lands at on the device.
    pub local_path: String,
}
