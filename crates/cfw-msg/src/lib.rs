//! ---
//! cfw_section: "02-messaging-bus"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Request and report payload model for the device bus."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod types;

/// Shared result type for payload operations.
pub type Result<T> = std::result::Result<T, MsgError>;

/// Errors raised while decoding inbound payloads.
#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    /// The payload was not valid JSON.
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload decoded to something other than a JSON object.
    #[error("request payload is not a json object")]
    NotAnObject,
}

pub use types::{
    decode_request, OtaRequest, OtaStatusReport, Report, RequestObject, ServiceKey,
    SettingsChanges, SettingsRequest, REPORT_TOPIC, REQUEST_TOPIC,
};
