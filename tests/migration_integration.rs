//! ---
//! cfw_section: "15-testing-qa"
//! cfw_subsection: "integration-tests"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "First-run migration behavior through daemon startup."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use serde_json::{json, Value as JsonValue};

use cfw_tests::{reports, start_daemon, SERIAL};

#[tokio::test]
async fn first_run_folds_legacy_state_and_announces_the_document() {
    let root = tempfile::tempdir().expect("tempdir");
    let device_dir = root.path().join(SERIAL);
    std::fs::create_dir_all(&device_dir).expect("mkdir");
    std::fs::write(device_dir.join("quick-boot"), "").expect("marker");
    std::fs::write(device_dir.join("perf_log"), "").expect("marker");

    let legacy = root.path().join("printer.json");
    std::fs::write(
        &legacy,
        json!({"cfw_sshd": true, "cfw_brightness": 70}).to_string(),
    )
    .expect("legacy config");

    let daemon = start_daemon(root.path(), Some(legacy.clone()), vec![2_000_000_000]).await;

    let published = reports(&daemon.collector);
    assert_eq!(published.len(), 1);
    let changes = &published[0]["settings"]["changes"];
    assert_eq!(changes["boot"]["quick_boot"], json!(true));
    assert_eq!(changes["boot"]["perf_log"], json!(true));
    assert_eq!(changes["boot"]["dump_emmc"], json!(false));
    assert_eq!(changes["ssh"]["enable"], json!(true));
    assert_eq!(changes["screen"]["brightness"], json!(70));
    // Untouched fields come out as schema defaults.
    assert_eq!(changes["lockscreen"]["locktype"], json!(0));

    // Markers are consumed; the flat file survives.
    assert!(!device_dir.join("quick-boot").exists());
    assert!(!device_dir.join("perf_log").exists());
    assert!(legacy.exists());

    // The announced document and the persisted one are the same thing.
    let on_disk: JsonValue = serde_json::from_str(
        &std::fs::read_to_string(&daemon.settings_file).expect("read settings"),
    )
    .expect("parse settings");
    assert_eq!(&on_disk, changes);
}

#[tokio::test]
async fn second_run_loads_quietly() {
    let root = tempfile::tempdir().expect("tempdir");

    let first = start_daemon(root.path(), None, vec![2_000_000_000]).await;
    assert_eq!(reports(&first.collector).len(), 1);
    drop(first);

    let second = start_daemon(root.path(), None, vec![2_000_000_000]).await;
    assert!(reports(&second.collector).is_empty());
}
