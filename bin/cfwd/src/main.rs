//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_subsection: "binary"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Binary entrypoint for the cfwd daemon."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use cfw_bus::UnixBus;
use cfw_common::buildinfo::DEFAULT_BUILD_INFO_PATH;
use cfw_common::{device_serial, init_tracing, BuildInfo, LogFormat};
use cfw_core::{DaemonContext, Dispatcher};
use cfw_ota::{HttpManifestSource, OtaChecker, OtaService, DEFAULT_MANIFEST_URL};
use cfw_settings::store::DEFAULT_SETTINGS_ROOT;
use cfw_settings::{SettingsPaths, SettingsService, SettingsStore};

const DEFAULT_LEGACY_CONFIG: &str = "/mnt/sdcard/cfw/printer.json";
const DEFAULT_BUS_SOCKET: &str = "/var/run/cfw/bus.sock";
const DEFAULT_LOG_DIR: &str = "/tmp/cfwd-logs";

#[derive(Parser, Debug)]
#[command(name = "cfwd", about = "CFW on-device services daemon")]
struct Cli {
    /// Root directory holding per-device settings directories.
    #[arg(long, env = "CFW_SETTINGS_ROOT", default_value = DEFAULT_SETTINGS_ROOT)]
    settings_root: PathBuf,

    /// Legacy flat configuration file consumed on first run.
    #[arg(long, env = "CFW_LEGACY_CONFIG", default_value = DEFAULT_LEGACY_CONFIG)]
    legacy_config: PathBuf,

    /// Build metadata file baked into the image.
    #[arg(long, env = "CFW_BUILD_INFO", default_value = DEFAULT_BUILD_INFO_PATH)]
    build_info: PathBuf,

    /// Update manifest endpoint.
    #[arg(long, env = "CFW_MANIFEST_URL", default_value = DEFAULT_MANIFEST_URL)]
    manifest_url: String,

    /// Bus bridge socket to subscribe on.
    #[arg(long, env = "CFW_BUS_SOCKET", default_value = DEFAULT_BUS_SOCKET)]
    bus_socket: PathBuf,

    /// Directory where runtime logs should be written.
    #[arg(long, env = "CFW_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Stdout log format (`structured-json` or `pretty`).
    #[arg(long, env = "CFW_LOG_FORMAT", default_value = "structured-json", value_parser = parse_log_format)]
    log_format: LogFormat,
}

fn parse_log_format(raw: &str) -> std::result::Result<LogFormat, String> {
    raw.parse()
}

// One logical thread of control: handlers never run concurrently, so the
// settings document and ota status need no locks.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("cfwd", &cli.log_dir, cli.log_format)?;

    let build = BuildInfo::load(&cli.build_info)?;
    info!(banner = %build.banner(), "starting cfwd");

    let serial = device_serial().context("device serial lookup failed")?;

    let (source, publisher) = UnixBus::connect(&cli.bus_socket)
        .await
        .with_context(|| format!("unable to reach bus bridge {}", cli.bus_socket.display()))?;
    let ctx = DaemonContext::new(Arc::new(publisher));

    let paths = SettingsPaths::for_serial(&cli.settings_root, serial)
        .with_legacy_config(cli.legacy_config);
    let settings_file = paths.settings_file();
    let opened = SettingsStore::open(paths).context("settings store startup failed")?;
    let settings = SettingsService::start(&ctx, opened).await?;

    let checker = OtaChecker::new(
        build,
        settings_file,
        Box::new(HttpManifestSource::new(cli.manifest_url)?),
    );
    let mut ota = OtaService::new(&ctx, checker);
    ota.startup_check().await?;

    let mut dispatcher = Dispatcher::new(Box::new(source));
    dispatcher.register(Box::new(settings))?;
    dispatcher.register(Box::new(ota))?;

    info!(socket = %cli.bus_socket.display(), "entering dispatch loop");
    tokio::select! {
        result = dispatcher.run() => result?,
        _ = shutdown_signal() => info!("shutdown signal received"),
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = ctrl_c() => {},
        _ = terminate() => {},
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
    }
}

async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => warn!(?err, "failed to install SIGTERM handler"),
    }
}
