//! ---
//! cfw_section: "03-settings-persistence"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Persistent per-device settings store with legacy migration."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use cfw_msg::RequestObject;

use crate::migration::migrate;
use crate::{Result, SettingsError};

/// Name of the settings document inside a device directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default root under which per-device settings directories live.
pub const DEFAULT_SETTINGS_ROOT: &str = "/mnt/sdcard/cfw/printers";

/// Filesystem locations used by a device's settings store.
#[derive(Debug, Clone)]
pub struct SettingsPaths {
    /// Per-device settings directory; also holds the legacy marker files.
    pub dir: PathBuf,
    /// Optional legacy flat configuration file consumed during migration.
    pub legacy_config: Option<PathBuf>,
}

impl SettingsPaths {
    /// Derive the paths for a device serial under the given root.
    pub fn for_serial(root: &Path, serial: &str) -> Self {
        Self {
            dir: root.join(serial),
            legacy_config: None,
        }
    }

    /// Attach a legacy flat configuration file to migrate from.
    #[must_use]
    pub fn with_legacy_config(mut self, path: PathBuf) -> Self {
        self.legacy_config = Some(path);
        self
    }

    /// Path of the settings document itself.
    pub fn settings_file(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE_NAME)
    }
}

/// Outcome of opening a store: the store plus, on first run, the migrated
/// document to announce on the bus.
pub struct OpenedStore {
    /// The ready-to-use store.
    pub store: SettingsStore,
    /// Full document contents when the file was just created; the caller
    /// publishes these as an initial changes report.
    pub created: Option<RequestObject>,
}

/// Owner of the per-device settings document.
///
/// The document lives in memory and is written back, in full, on every
/// mutation. Other firmware components read the file directly, so every
/// write goes through a temp file in the same directory and an atomic
/// rename; a direct reader never observes a torn document.
pub struct SettingsStore {
    paths: SettingsPaths,
    document: RequestObject,
}

impl SettingsStore {
    /// Load the device document, migrating legacy state when no document
    /// exists yet. A present-but-unparsable document is a fatal error.
    pub fn open(paths: SettingsPaths) -> Result<OpenedStore> {
        fs::create_dir_all(&paths.dir)?;
        let file = paths.settings_file();

        if file.exists() {
            let raw = fs::read_to_string(&file)?;
            let document = match serde_json::from_str::<JsonValue>(&raw)? {
                JsonValue::Object(map) => map,
                _ => return Err(SettingsError::NotAnObject(file.display().to_string())),
            };
            debug!(file = %file.display(), "loaded settings document");
            return Ok(OpenedStore {
                store: Self { paths, document },
                created: None,
            });
        }

        info!(file = %file.display(), "no settings document; migrating legacy state");
        let document = migrate(&paths);
        let store = Self { paths, document };
        store.persist()?;
        Ok(OpenedStore {
            created: Some(store.document.clone()),
            store,
        })
    }

    /// The in-memory document.
    pub fn document(&self) -> &RequestObject {
        &self.document
    }

    /// Overwrite each named top-level key wholesale and persist.
    ///
    /// The merge is deliberately shallow: a request supplying only one
    /// nested sub-field replaces the whole section. Clients depend on this.
    /// Returns only after the document is durably visible on disk.
    pub fn apply_set(&mut self, set: &RequestObject) -> Result<()> {
        for (key, value) in set {
            self.document.insert(key.clone(), value.clone());
        }
        self.persist()?;
        info!(keys = ?set.keys().collect::<Vec<_>>(), "settings updated");
        Ok(())
    }

    /// Write the full document through a temp file and atomic rename.
    pub fn persist(&self) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.paths.dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.document)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.paths.settings_file())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::default_document;
    use serde_json::json;

    fn open_in(dir: &Path) -> OpenedStore {
        SettingsStore::open(SettingsPaths::for_serial(dir, "SN-TEST")).expect("open store")
    }

    #[test]
    fn first_open_creates_defaults_and_reports_them() {
        let root = tempfile::tempdir().expect("tempdir");
        let opened = open_in(root.path());

        assert_eq!(opened.created.as_ref(), Some(&default_document()));
        let on_disk: JsonValue = serde_json::from_str(
            &fs::read_to_string(opened.store.paths.settings_file()).expect("read"),
        )
        .expect("parse");
        assert_eq!(on_disk["screen"]["brightness"], json!(100));
    }

    #[test]
    fn second_open_reads_existing_document_without_report() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut first = open_in(root.path());
        let mut set = RequestObject::new();
        set.insert("shield_mode".to_string(), json!(true));
        first.store.apply_set(&set).expect("apply");

        let second = open_in(root.path());
        assert!(second.created.is_none());
        assert_eq!(second.store.document()["shield_mode"], json!(true));
    }

    #[test]
    fn corrupt_document_is_fatal() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = SettingsPaths::for_serial(root.path(), "SN-TEST");
        fs::create_dir_all(&paths.dir).expect("mkdir");
        fs::write(paths.settings_file(), "{broken").expect("write");

        assert!(matches!(
            SettingsStore::open(paths),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn non_object_document_is_fatal() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = SettingsPaths::for_serial(root.path(), "SN-TEST");
        fs::create_dir_all(&paths.dir).expect("mkdir");
        fs::write(paths.settings_file(), "[1, 2]").expect("write");

        assert!(matches!(
            SettingsStore::open(paths),
            Err(SettingsError::NotAnObject(_))
        ));
    }

    #[test]
    fn apply_set_replaces_sections_wholesale() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut opened = open_in(root.path());

        let mut set = RequestObject::new();
        set.insert("screen".to_string(), json!({"brightness": 40}));
        opened.store.apply_set(&set).expect("apply");

        // Shallow merge: the other screen fields are gone, not preserved.
        assert_eq!(
            opened.store.document()["screen"],
            json!({"brightness": 40})
        );

        let on_disk: JsonValue = serde_json::from_str(
            &fs::read_to_string(opened.store.paths.settings_file()).expect("read"),
        )
        .expect("parse");
        assert_eq!(on_disk["screen"], json!({"brightness": 40}));
    }

    #[test]
    fn apply_set_is_idempotent() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut opened = open_in(root.path());

        let mut set = RequestObject::new();
        set.insert("default_console".to_string(), json!(true));

        opened.store.apply_set(&set).expect("first apply");
        let first = fs::read_to_string(opened.store.paths.settings_file()).expect("read");
        opened.store.apply_set(&set).expect("second apply");
        let second = fs::read_to_string(opened.store.paths.settings_file()).expect("read");

        assert_eq!(first, second);
    }

    #[test]
    fn persist_leaves_no_partial_files_behind() {
        let root = tempfile::tempdir().expect("tempdir");
        let opened = open_in(root.path());
        opened.store.persist().expect("persist");

        let entries: Vec<_> = fs::read_dir(&opened.store.paths.dir)
            .expect("readdir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(SETTINGS_FILE_NAME)]);
    }
}
