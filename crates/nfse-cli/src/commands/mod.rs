//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use nfse_core::models::config::NfseConfig;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nfse")
        .join("config.json")
}

/// The `-c` path if given, the default location otherwise.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration.
///
/// An explicit path must exist. Without one the default file is used when
/// present and built-in defaults otherwise.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<NfseConfig> {
    if let Some(path) = explicit {
        let config = NfseConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?;
        debug!("Loaded configuration from {}", path);
        return Ok(config);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loaded configuration from {}", path.display());
        Ok(NfseConfig::from_file(&path)?)
    } else {
        Ok(NfseConfig::default())
    }
}

/// Log filter from the configuration file, if one is set there.
///
/// Runs before logging is initialised, so load failures are silent here and
/// reported by the command itself.
pub fn configured_filter(explicit: Option<&str>) -> Option<String> {
    load_config(explicit).ok()?.logging.filter
}
