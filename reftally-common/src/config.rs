//! Configuration loading and data directory resolution

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default HTTP port for the live service
pub const DEFAULT_PORT: u16 = 8000;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "REFTALLY_DATA_DIR";

/// Optional settings from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Data directory resolution, priority order:
/// 1. Command-line argument (highest priority)
/// 2. `REFTALLY_DATA_DIR` environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, file: &FileConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }
    if let Some(path) = &file.data_dir {
        return path.clone();
    }
    default_data_dir()
}

/// Load the platform config file, if present
pub fn load_file_config() -> FileConfig {
    match find_config_file() {
        Some(path) => load_file_config_from(&path),
        None => FileConfig::default(),
    }
}

/// Load settings from a specific TOML file
///
/// A missing or malformed file degrades to defaults with a warning; the
/// services never refuse to start over config-file problems.
pub fn load_file_config_from(path: &Path) -> FileConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("could not read config file {}: {}", path.display(), e);
            return FileConfig::default();
        }
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring malformed config file {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

/// Locate the platform config file path
fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("reftally").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/reftally/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reftally"))
        .unwrap_or_else(|| PathBuf::from("./reftally_data"))
}
