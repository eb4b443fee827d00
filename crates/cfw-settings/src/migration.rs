//! ---
//! cfw_section: "03-settings-persistence"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Persistent per-device settings store with legacy migration."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::fs;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use cfw_msg::RequestObject;

use crate::document::default_document;
use crate::store::SettingsPaths;

/// Marker file name → `boot.*` field it encodes.
const BOOT_MARKERS: &[(&str, &str)] = &[
    ("quick-boot", "quick_boot"),
    ("dump-emmc", "dump_emmc"),
    ("logsd", "sdcard_syslog"),
    ("perf_log", "perf_log"),
];

/// Legacy flat key → (section, field) it maps to. A `None` section targets a
/// flat top-level key.
const LEGACY_KEYS: &[(&str, Option<&str>, &str)] = &[
    ("cfw_sshd", Some("ssh"), "enable"),
    ("cfw_rootpw", Some("ssh"), "password"),
    ("cfw_home_image", Some("screen"), "home_image"),
    ("cfw_print_image", Some("screen"), "print_image"),
    ("cfw_brightness", Some("screen"), "brightness"),
    ("cfw_passcode", Some("lockscreen"), "passcode"),
    ("cfw_locktype", Some("lockscreen"), "locktype"),
    ("cfw_lockscreen_image", Some("lockscreen"), "lockscreen_image"),
    ("cfw_toolhead_led", Some("leds"), "toolhead"),
    ("cfw_default_console", None, "default_console"),
    ("cfw_shield", None, "shield_mode"),
    ("cfw_vc", None, "vibration_comp"),
];

/// Build the first settings document for a device by folding legacy state
/// into the defaults.
///
/// Marker files are consumed (deleted, best effort). The legacy flat file is
/// read but left in place; the cleanup pass stays disabled until every
/// consumer of that file has moved over.
pub(crate) fn migrate(paths: &SettingsPaths) -> RequestObject {
    let mut document = default_document();

    for (marker, field) in BOOT_MARKERS {
        let marker_path = paths.dir.join(marker);
        if !marker_path.exists() {
            continue;
        }
        if let Some(boot) = document.get_mut("boot").and_then(JsonValue::as_object_mut) {
            boot.insert((*field).to_string(), JsonValue::Bool(true));
        }
        debug!(marker = *marker, "consumed legacy boot marker");
        if let Err(err) = fs::remove_file(&marker_path) {
            // Absent markers are normal; anything else is worth a line.
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(marker = *marker, %err, "could not delete legacy marker");
            }
        }
    }

    if let Some(legacy_path) = &paths.legacy_config {
        if legacy_path.exists() {
            match read_legacy_config(legacy_path) {
                Ok(legacy) => fold_legacy_keys(&mut document, &legacy),
                Err(err) => {
                    warn!(file = %legacy_path.display(), %err, "ignoring unreadable legacy config")
                }
            }
        }
    }

    document
}

fn read_legacy_config(path: &std::path::Path) -> std::io::Result<RequestObject> {
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str::<JsonValue>(&raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "legacy config is not a json object",
        )),
        Err(err) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, err)),
    }
}

fn fold_legacy_keys(document: &mut RequestObject, legacy: &RequestObject) {
    for (legacy_key, section, field) in LEGACY_KEYS {
        let Some(value) = legacy.get(*legacy_key) else {
            continue;
        };
        let target = match section {
            Some(section) => document
                .get_mut(*section)
                .and_then(JsonValue::as_object_mut),
            None => Some(&mut *document),
        };
        if let Some(target) = target {
            target.insert((*field).to_string(), value.clone());
            debug!(key = *legacy_key, "migrated legacy setting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths_in(dir: &std::path::Path) -> SettingsPaths {
        let paths = SettingsPaths::for_serial(dir, "SN-MIG");
        fs::create_dir_all(&paths.dir).expect("mkdir");
        paths
    }

    #[test]
    fn markers_flip_boot_fields_and_are_consumed() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = paths_in(root.path());
        fs::write(paths.dir.join("quick-boot"), "").expect("marker");
        fs::write(paths.dir.join("logsd"), "").expect("marker");

        let document = migrate(&paths);

        assert_eq!(document["boot"]["quick_boot"], json!(true));
        assert_eq!(document["boot"]["sdcard_syslog"], json!(true));
        assert_eq!(document["boot"]["dump_emmc"], json!(false));
        assert_eq!(document["boot"]["perf_log"], json!(false));
        assert!(!paths.dir.join("quick-boot").exists());
        assert!(!paths.dir.join("logsd").exists());
    }

    #[test]
    fn no_legacy_state_yields_exact_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = paths_in(root.path());
        assert_eq!(migrate(&paths), default_document());
    }

    #[test]
    fn legacy_flat_keys_fold_into_nested_fields() {
        let root = tempfile::tempdir().expect("tempdir");
        let legacy_file = root.path().join("legacy.json");
        fs::write(
            &legacy_file,
            serde_json::to_string(&json!({
                "cfw_sshd": true,
                "cfw_rootpw": "hunter2",
                "cfw_brightness": 55,
                "cfw_locktype": 2,
                "cfw_shield": true,
                "cfw_vc": {"freq": [31.0, 42.5]},
                "unrelated_key": "ignored"
            }))
            .expect("encode"),
        )
        .expect("write legacy");
        let paths = paths_in(root.path()).with_legacy_config(legacy_file.clone());

        let document = migrate(&paths);

        assert_eq!(document["ssh"]["enable"], json!(true));
        assert_eq!(document["ssh"]["password"], json!("hunter2"));
        assert_eq!(document["screen"]["brightness"], json!(55));
        // Absent legacy keys keep their defaults.
        assert_eq!(document["screen"]["home_image"], json!(""));
        assert_eq!(document["lockscreen"]["locktype"], json!(2));
        assert_eq!(document["lockscreen"]["passcode"], json!(""));
        assert_eq!(document["shield_mode"], json!(true));
        assert_eq!(document["vibration_comp"], json!({"freq": [31.0, 42.5]}));
        assert_eq!(document["default_console"], json!(false));
        assert!(!document.contains_key("unrelated_key"));

        // The flat file is read-only input; it survives migration.
        assert!(legacy_file.exists());
    }

    #[test]
    fn unreadable_legacy_config_falls_back_to_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let legacy_file = root.path().join("legacy.json");
        fs::write(&legacy_file, "{truncated").expect("write legacy");
        let paths = paths_in(root.path()).with_legacy_config(legacy_file);

        assert_eq!(migrate(&paths), default_document());
    }
}
