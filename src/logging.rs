use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Route diagnostics to a log file under the config directory.
///
/// The terminal itself owns stderr while the TUI is up, so nothing may be
/// printed there. Filter comes from `NETROUTER_LOG`, then `RUST_LOG`, then
/// a quiet default.
pub fn init() -> Result<()> {
    let filter = std::env::var("NETROUTER_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info,netrouter_tui=debug"));

    let log_path = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("netrouter");
    std::fs::create_dir_all(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path.join("netrouter.log"))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .compact()
        .try_init();

    Ok(())
}
