//! Daemon configuration: optional TOML file plus environment overrides.
//!
//! Precedence per setting: environment variable, then `daemon.toml`, then the
//! default under `~/.playtime/`.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PLAYTIME_CONFIG";
pub const DATA_FILE_ENV: &str = "PLAYTIME_DATA_FILE";
pub const SOCKET_ENV: &str = "PLAYTIME_SOCKET";

const HOME_DIR_NAME: &str = ".playtime";
const CONFIG_FILE_NAME: &str = "daemon.toml";
const DATA_FILE_NAME: &str = "game_data.json";
const SOCKET_NAME: &str = "daemon.sock";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub data_file: Option<PathBuf>,
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub data_file: PathBuf,
    pub socket_path: PathBuf,
}

pub fn playtime_home() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(HOME_DIR_NAME))
}

fn default_config_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(playtime_home()?.join(CONFIG_FILE_NAME))
}

pub fn load_config(path: Option<PathBuf>) -> Result<DaemonConfig, String> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(DaemonConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|err| {
        format!(
            "Failed to read daemon config {}: {}",
            config_path.display(),
            err
        )
    })?;
    toml::from_str::<DaemonConfig>(&content).map_err(|err| {
        format!(
            "Failed to parse daemon config {}: {}",
            config_path.display(),
            err
        )
    })
}

pub fn resolve_paths(config: &DaemonConfig) -> Result<ResolvedPaths, String> {
    let home = playtime_home()?;
    Ok(resolve_paths_with(config, &home, |key| env::var(key).ok()))
}

fn resolve_paths_with<F>(config: &DaemonConfig, home: &Path, lookup: F) -> ResolvedPaths
where
    F: Fn(&str) -> Option<String>,
{
    let data_file = lookup(DATA_FILE_ENV)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| config.data_file.clone())
        .unwrap_or_else(|| home.join(DATA_FILE_NAME));
    let socket_path = lookup(SOCKET_ENV)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(|| home.join(SOCKET_NAME));

    ResolvedPaths {
        data_file,
        socket_path,
    }
}
