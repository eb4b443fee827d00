//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Shared primitives for the CFW daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use tracing::debug;

/// Vendor helper that prints the device serial number.
pub const SERIAL_HELPER: &str = "psn-query";

static SERIAL: OnceCell<String> = OnceCell::new();

/// Serial number of the device this daemon is running on.
///
/// The helper is invoked at most once per process; the result is cached for
/// every later settings-path derivation. Failure here is unrecoverable and
/// aborts daemon startup.
pub fn device_serial() -> Result<&'static str> {
    SERIAL
        .get_or_try_init(|| query_serial(SERIAL_HELPER))
        .map(String::as_str)
}

fn query_serial(helper: &str) -> Result<String> {
    let output = Command::new(helper)
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("failed to invoke serial helper '{}'", helper))?;

    if !output.status.success() {
        return Err(anyhow!(
            "serial helper '{}' exited with {}",
            helper,
            output.status
        ));
    }

    let serial = String::from_utf8(output.stdout)
        .context("serial helper produced non-utf8 output")?
        .trim()
        .to_owned();
    if serial.is_empty() {
        return Err(anyhow!("serial helper '{}' produced no output", helper));
    }

    debug!(%serial, "resolved device serial number");
    Ok(serial)
}
