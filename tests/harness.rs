//! ---
//! cfw_section: "15-testing-qa"
//! cfw_subsection: "integration-tests"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Shared wiring for integration test suites."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use cfw_bus::{in_memory_pair, CollectingPublisher, RequestInjector};
use cfw_common::BuildInfo;
use cfw_core::{DaemonContext, Dispatcher};
use cfw_ota::{Manifest, ManifestSource, OtaChecker, OtaService};
use cfw_settings::{SettingsPaths, SettingsService, SettingsStore};

/// Serial used by every integration daemon.
pub const SERIAL: &str = "SN-ITEST-0001";

/// Local build the test daemons believe they run.
pub const LOCAL_BUILD: i64 = 1_700_000_000;

/// Manifest source that replays a fixed sequence, repeating the last entry.
pub struct ScriptedManifests {
    manifests: Mutex<Vec<Manifest>>,
}

impl ScriptedManifests {
    pub fn new(manifests: Vec<Manifest>) -> Self {
        Self {
            manifests: Mutex::new(manifests),
        }
    }
}

#[async_trait]
impl ManifestSource for ScriptedManifests {
    async fn fetch(&self) -> cfw_ota::Result<Manifest> {
        let mut guard = self.manifests.lock().expect("manifests poisoned");
        if guard.len() > 1 {
            Ok(guard.remove(0))
        } else {
            Ok(guard[0].clone())
        }
    }
}

pub fn manifest(build_timestamp: i64) -> Manifest {
    Manifest {
        version: "2.0.0".to_string(),
        build_timestamp,
        files: Vec::new(),
        notes: None,
    }
}

/// Fully wired daemon over an in-memory bus.
pub struct Daemon {
    pub injector: RequestInjector,
    pub collector: CollectingPublisher,
    pub dispatcher: Dispatcher,
    pub settings_dir: PathBuf,
    pub settings_file: PathBuf,
}

/// Assemble the daemon the way `cfwd` does, minus the real bus and the
/// startup check, so suites control exactly which reports exist.
pub async fn start_daemon(
    root: &Path,
    legacy_config: Option<PathBuf>,
    remote_builds: Vec<i64>,
) -> Daemon {
    let (injector, source) = in_memory_pair();
    let collector = CollectingPublisher::new();
    let ctx = DaemonContext::new(Arc::new(collector.clone()));

    let mut paths = SettingsPaths::for_serial(root, SERIAL);
    if let Some(legacy) = legacy_config {
        paths = paths.with_legacy_config(legacy);
    }
    let settings_dir = paths.dir.clone();
    let settings_file = paths.settings_file();

    let opened = SettingsStore::open(paths).expect("settings store opens");
    let settings = SettingsService::start(&ctx, opened)
        .await
        .expect("settings service starts");

    let build = BuildInfo {
        version: "1.0.0".to_string(),
        date: "2023-11-14".to_string(),
        build_timestamp: LOCAL_BUILD,
    };
    let manifests = remote_builds.into_iter().map(manifest).collect();
    let checker = OtaChecker::new(
        build,
        settings_file.clone(),
        Box::new(ScriptedManifests::new(manifests)),
    );
    let ota = OtaService::new(&ctx, checker);

    let mut dispatcher = Dispatcher::new(Box::new(source));
    dispatcher
        .register(Box::new(settings))
        .expect("register settings");
    dispatcher.register(Box::new(ota)).expect("register ota");

    Daemon {
        injector,
        collector,
        dispatcher,
        settings_dir,
        settings_file,
    }
}

/// Parse everything the daemon published so far, in order.
pub fn reports(collector: &CollectingPublisher) -> Vec<JsonValue> {
    collector
        .take()
        .iter()
        .map(|raw| serde_json::from_str(raw).expect("report is json"))
        .collect()
}
