pub mod ask;
pub mod doctor;
pub mod index;
pub mod init;
pub mod serve;

use ledgerwise_config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The config file in effect: `--config` or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config from the resolved path with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    debug!(path = %path.display(), "Loading config");
    AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}").into())
}
