//! ---
//! cfw_section: "02-messaging-bus"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Request and report payload model for the device bus."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{MsgError, Result};

/// Topic the daemon subscribes to for inbound requests.
pub const REQUEST_TOPIC: &str = "device/request/cfw";

/// Topic the daemon publishes reports on.
pub const REPORT_TOPIC: &str = "device/report/cfw";

/// A decoded inbound request: a JSON object keyed by service name.
pub type RequestObject = serde_json::Map<String, JsonValue>;

/// Decode a raw bus payload into a request object.
///
/// Anything other than a JSON object at the top level is rejected; requests
/// are routed by their top-level keys, so there is nothing useful the
/// dispatcher could do with an array or scalar.
pub fn decode_request(raw: &str) -> Result<RequestObject> {
    match serde_json::from_str::<JsonValue>(raw)? {
        JsonValue::Object(map) => Ok(map),
        _ => Err(MsgError::NotAnObject),
    }
}

/// Recognized top-level request keys, one per registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKey {
    /// Per-device settings service.
    Settings,
    /// Firmware update checker.
    Ota,
}

impl ServiceKey {
    /// Wire name of the key as it appears in request objects.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Settings => "settings",
            ServiceKey::Ota => "ota",
        }
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound report envelope.
///
/// External tagging means every serialized report carries exactly one
/// top-level key, matching the routing convention on the request side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    /// Settings changed (or were created at first start).
    Settings(SettingsChanges),
    /// Current OTA status record.
    Ota(OtaStatusReport),
}

impl Report {
    /// Service key this report belongs to.
    pub fn key(&self) -> ServiceKey {
        match self {
            Report::Settings(_) => ServiceKey::Settings,
            Report::Ota(_) => ServiceKey::Ota,
        }
    }
}

/// Body of a settings report: the keys that were (re)written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsChanges {
    /// Top-level keys and the values they now hold.
    pub changes: RequestObject,
}

/// Body of an OTA status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtaStatusReport {
    /// Whether a newer firmware build is known to exist.
    pub ota_available: bool,
    /// Whether the most recent real check attempt failed.
    pub err_on_last_check: bool,
    /// Timestamp of the most recent real check attempt, if any.
    pub last_checked: Option<DateTime<Utc>>,
    /// Manifest returned by the most recent successful check, if any.
    pub ota_info: Option<JsonValue>,
    /// Whether the update payload has been fetched. Tracked only; the
    /// download path lives outside this daemon.
    pub is_downloaded: bool,
}

/// Sub-request carried under the `settings` key.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsRequest {
    /// Mapping of top-level settings keys to their new values. Left as a
    /// raw value so the handler can reject non-object payloads itself.
    #[serde(default)]
    pub set: Option<JsonValue>,
}

/// Sub-request carried under the `ota` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtaRequest {
    /// When true, perform a real check; otherwise report status only.
    #[serde(default)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_serializes_with_single_top_level_key() {
        let mut changes = RequestObject::new();
        changes.insert("shield_mode".to_string(), json!(true));
        let report = Report::Settings(SettingsChanges { changes });

        let value = serde_json::to_value(&report).expect("serialize report");
        let object = value.as_object().expect("report is an object");
        assert_eq!(object.len(), 1);
        assert_eq!(
            object["settings"]["changes"]["shield_mode"],
            json!(true)
        );
    }

    #[test]
    fn ota_report_uses_wire_field_names() {
        let report = Report::Ota(OtaStatusReport {
            ota_available: true,
            err_on_last_check: false,
            last_checked: None,
            ota_info: None,
            is_downloaded: false,
        });

        let value = serde_json::to_value(&report).expect("serialize report");
        let body = value["ota"].as_object().expect("ota body");
        assert!(body.contains_key("ota_available"));
        assert!(body.contains_key("err_on_last_check"));
        assert!(body.contains_key("last_checked"));
        assert!(body.contains_key("is_downloaded"));
        assert_eq!(value["ota"]["last_checked"], JsonValue::Null);
    }

    #[test]
    fn decode_request_rejects_non_objects() {
        assert!(decode_request("{\"ota\": {\"check\": true}}").is_ok());
        assert!(matches!(
            decode_request("[1, 2, 3]"),
            Err(MsgError::NotAnObject)
        ));
        assert!(matches!(decode_request("not json"), Err(MsgError::Json(_))));
    }

    #[test]
    fn sub_requests_tolerate_missing_fields() {
        let ota: OtaRequest = serde_json::from_value(json!({})).expect("empty ota");
        assert!(!ota.check);

        let settings: SettingsRequest =
            serde_json::from_value(json!({"set": "nope"})).expect("string set decodes");
        assert_eq!(settings.set, Some(json!("nope")));
    }
}
