use anyhow::{Context, Result, anyhow};
use backup_rotator_core::EngineConfig;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "backup-rotator.toml";

/// 100 GiB.
pub const DEFAULT_MAX_SIZE_KB: u64 = 100 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_max_size_kb")]
    pub max_size_kb: u64,
    /// Defaults to the storage backend's recommended chunk size.
    pub chunk_size_kb: Option<usize>,
    pub storage: EngineConfig,
    pub rotator: Option<EngineConfig>,
}

fn default_max_size_kb() -> u64 {
    DEFAULT_MAX_SIZE_KB
}

impl AppConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid configuration {}", path.display()))
    }

    /// Loads `explicit` if given, otherwise the first existing file among
    /// `./backup-rotator.toml` and the user configuration directory.
    pub fn discover(explicit: Option<&Path>) -> Result<(PathBuf, Self)> {
        if let Some(path) = explicit {
            return Ok((path.to_path_buf(), Self::load(path)?));
        }
        let path = candidate_paths()
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| anyhow!("No configuration found (use --config or BACKUP_ROTATOR_CONFIG)"))?;
        let config = Self::load(&path)?;
        Ok((path, config))
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
    if let Some(dirs) = ProjectDirs::from("", "", "backup-rotator") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    paths
}
