//! ---
//! cfw_section: "03-settings-persistence"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Persistent per-device settings store with legacy migration."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use cfw_msg::RequestObject;

fn default_brightness() -> i64 {
    100
}

fn default_toolhead() -> bool {
    true
}

/// Schema of a freshly created settings document.
///
/// This typed form exists only to produce defaults: the live store keeps the
/// document as a raw JSON object, because a set-request may replace any
/// top-level key with an arbitrary value and that behavior is load-bearing
/// for existing UI clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingsDocument {
    /// Boot-time switches consumed by the init scripts.
    #[serde(default)]
    pub boot: BootSettings,
    /// Update-checker switches.
    #[serde(default)]
    pub ota: OtaSettings,
    /// Dropbear configuration.
    #[serde(default)]
    pub ssh: SshSettings,
    /// Screen imagery and backlight.
    #[serde(default)]
    pub screen: ScreenSettings,
    /// Lockscreen configuration.
    #[serde(default)]
    pub lockscreen: LockscreenSettings,
    /// LED behavior.
    #[serde(default)]
    pub leds: LedSettings,
    /// Whether the on-screen console is shown by default.
    #[serde(default)]
    pub default_console: bool,
    /// Whether shield mode is active.
    #[serde(default)]
    pub shield_mode: bool,
    /// Saved vibration compensation calibration, if any.
    #[serde(default)]
    pub vibration_comp: Option<JsonValue>,
}

/// Boot-time switches, formerly encoded as marker files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BootSettings {
    /// Skip the vendor boot animation and self-test.
    #[serde(default)]
    pub quick_boot: bool,
    /// Dump the eMMC to SD card on next boot.
    #[serde(default)]
    pub dump_emmc: bool,
    /// Mirror syslog onto the SD card.
    #[serde(default)]
    pub sdcard_syslog: bool,
    /// Enable performance logging for debugging.
    #[serde(default)]
    pub perf_log: bool,
}

/// Update-checker switches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OtaSettings {
    /// Whether remote update checks are allowed.
    #[serde(default)]
    pub enable: bool,
}

/// Dropbear configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SshSettings {
    /// Whether the ssh daemon is started at boot.
    #[serde(default)]
    pub enable: bool,
    /// Root password; empty means key-only.
    #[serde(default)]
    pub password: String,
}

/// Screen imagery and backlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSettings {
    /// Custom home screen image path.
    #[serde(default)]
    pub home_image: String,
    /// Custom in-print image path.
    #[serde(default)]
    pub print_image: String,
    /// Backlight brightness percentage.
    #[serde(default = "default_brightness")]
    pub brightness: i64,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            home_image: String::new(),
            print_image: String::new(),
            brightness: default_brightness(),
        }
    }
}

/// Lockscreen configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LockscreenSettings {
    /// Unlock passcode; empty means unset.
    #[serde(default)]
    pub passcode: String,
    /// Lock style selector.
    #[serde(default)]
    pub locktype: i64,
    /// Custom lockscreen image path.
    #[serde(default)]
    pub lockscreen_image: String,
}

/// LED behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedSettings {
    /// Whether the toolhead LED is on.
    #[serde(default = "default_toolhead")]
    pub toolhead: bool,
}

impl Default for LedSettings {
    fn default() -> Self {
        Self {
            toolhead: default_toolhead(),
        }
    }
}

/// Default settings document as a raw JSON object.
pub fn default_document() -> RequestObject {
    match serde_json::to_value(SettingsDocument::default()) {
        Ok(JsonValue::Object(map)) => map,
        // A struct with named fields always serializes to an object.
        _ => unreachable!("default settings document serializes to an object"),
    }
}
