//! ---
//! cfw_section: "03-settings-persistence"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Persistent per-device settings store with legacy migration."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod document;
mod migration;
pub mod service;
pub mod store;

/// Shared result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised by the settings store.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Wrapper for IO errors on the settings directory.
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    /// The on-disk document could not be parsed. Fatal at startup; the
    /// store never silently replaces a corrupt document.
    #[error("settings document error: {0}")]
    Json(#[from] serde_json::Error),
    /// The atomic rename of a freshly written document failed.
    #[error("settings persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
    /// The on-disk document was not a JSON object.
    #[error("settings file {0} does not contain a json object")]
    NotAnObject(String),
}

pub use document::default_document;
pub use service::SettingsService;
pub use store::{SettingsPaths, SettingsStore};
