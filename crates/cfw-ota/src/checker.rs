//! ---
//! cfw_section: "04-ota-updates"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Firmware update checker for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use cfw_common::BuildInfo;
use cfw_msg::OtaStatusReport;

use crate::fetch::ManifestSource;
use crate::Manifest;

static CHECKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cfwd_ota_checks_total",
        "Update checks actually attempted against the manifest endpoint"
    )
    .expect("metric registration to succeed")
});

static CHECK_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cfwd_ota_check_failures_total",
        "Update checks that failed to fetch or decode the manifest"
    )
    .expect("metric registration to succeed")
});

/// In-memory update-check status. Never persisted: a daemon restart resets
/// it and triggers one fresh check.
#[derive(Debug, Clone, Default)]
pub struct OtaStatus {
    /// A newer build than the local one is known to exist. Monotonic: once
    /// true it stays true for the life of the process.
    pub available: bool,
    /// When the last real check attempt was made. Skipped checks (status
    /// queries, disabled feature) leave this untouched.
    pub last_check_time: Option<DateTime<Utc>>,
    /// Manifest from the last successful check.
    pub last_check_response: Option<Manifest>,
    /// Whether the last real check attempt failed.
    pub last_check_error: bool,
    /// Whether the payload has been fetched; owned by the downloader,
    /// only carried here.
    pub downloaded: bool,
}

impl OtaStatus {
    /// Wire form of this record.
    pub fn to_report(&self) -> OtaStatusReport {
        OtaStatusReport {
            ota_available: self.available,
            err_on_last_check: self.last_check_error,
            last_checked: self.last_check_time,
            ota_info: self
                .last_check_response
                .as_ref()
                .and_then(|manifest| serde_json::to_value(manifest).ok()),
            is_downloaded: self.downloaded,
        }
    }
}

/// Update-check state machine.
///
/// Reads `ota.enable` from the on-disk settings document at check time, so
/// a toggle takes effect immediately and a device that has never created a
/// settings file behaves as disabled.
pub struct OtaChecker {
    build: BuildInfo,
    settings_file: PathBuf,
    source: Box<dyn ManifestSource>,
    status: OtaStatus,
}

impl OtaChecker {
    /// Assemble a checker in the idle state.
    pub fn new(build: BuildInfo, settings_file: PathBuf, source: Box<dyn ManifestSource>) -> Self {
        Self {
            build,
            settings_file,
            source,
            status: OtaStatus::default(),
        }
    }

    /// Current status record.
    pub fn status(&self) -> &OtaStatus {
        &self.status
    }

    /// Perform one check if the feature is enabled; otherwise leave the
    /// status untouched. Transport and decode failures mark the error flag
    /// and preserve whatever availability was known before.
    pub async fn check(&mut self) {
        if !self.enabled() {
            debug!("update checking disabled; leaving status unchanged");
            return;
        }

        self.status.last_check_time = Some(Utc::now());
        CHECKS_TOTAL.inc();

        match self.source.fetch().await {
            Err(err) => {
                CHECK_FAILURES_TOTAL.inc();
                self.status.last_check_error = true;
                warn!(%err, "update check failed");
            }
            Ok(manifest) => {
                self.status.last_check_error = false;
                if manifest.build_timestamp > self.build.build_timestamp {
                    if !self.status.available {
                        info!(
                            remote_version = %manifest.version,
                            remote_build = manifest.build_timestamp,
                            local_build = self.build.build_timestamp,
                            "newer firmware build available"
                        );
                    }
                    self.status.available = true;
                }
                self.status.last_check_response = Some(manifest);
            }
        }
    }

    fn enabled(&self) -> bool {
        let raw = match fs::read_to_string(&self.settings_file) {
            Ok(raw) => raw,
            // No settings document yet means the feature was never turned on.
            Err(_) => return false,
        };
        match serde_json::from_str::<JsonValue>(&raw) {
            Ok(document) => document["ota"]["enable"].as_bool().unwrap_or(false),
            Err(err) => {
                warn!(%err, "unparsable settings document; treating updates as disabled");
                false
            }
        }
    }
}
