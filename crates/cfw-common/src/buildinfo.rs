//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Shared primitives for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default location of the build metadata file baked into the image.
pub const DEFAULT_BUILD_INFO_PATH: &str = "/opt/cfw/build-info.json";

/// Metadata describing the firmware build this daemon shipped with.
///
/// Written by the image build pipeline; loaded once at startup and never
/// mutated. `build_timestamp` is the value compared against remote update
/// manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Human-readable firmware version string.
    pub version: String,
    /// Build date as stamped by the pipeline.
    pub date: String,
    /// Seconds since the epoch at which the image was built.
    pub build_timestamp: i64,
}

impl BuildInfo {
    /// Load build metadata from disk. An unreadable or malformed file is a
    /// fatal startup condition.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to read build info {}", path.display()))?;
        let info: BuildInfo = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse build info {}", path.display()))?;
        Ok(info)
    }

    /// Banner used in startup logging.
    #[must_use]
    pub fn banner(&self) -> String {
        format!("CFW v{} (built {})", self.version, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_parses_pipeline_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("build-info.json");
        fs::write(
            &path,
            r#"{"version": "1.4.2", "date": "2024-03-01", "build_timestamp": 1709251200}"#,
        )
        .expect("write build info");

        let info = BuildInfo::load(&path).expect("load");
        assert_eq!(info.version, "1.4.2");
        assert_eq!(info.build_timestamp, 1709251200);
        assert!(info.banner().contains("1.4.2"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = BuildInfo::load(&dir.path().join("absent.json")).expect_err("must fail");
        assert!(err.to_string().contains("unable to read"));
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("build-info.json");
        fs::write(&path, "{not json").expect("write");
        let err = BuildInfo::load(&path).expect_err("must fail");
        assert!(err.to_string().contains("failed to parse"));
    }
}
