//! Engine configuration loaded from `~/.config/hoist/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchOptions;

/// Tunable engine parameters. Everything has a sensible default; hosts only
/// ship a config file when they need to deviate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for the HEAD existence probe, in seconds.
    pub probe_timeout_secs: u64,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout for one artifact download, in seconds.
    pub transfer_timeout_secs: u64,
    /// Concurrent artifact fetches (None = derived from CPU count; network
    /// work gets a wider pool than rewrites).
    #[serde(default)]
    pub fetch_parallelism: Option<usize>,
    /// Concurrent artifact rewrites (None = CPU count).
    #[serde(default)]
    pub rewrite_parallelism: Option<usize>,
    /// Override for the identification header sent with requests.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 10,
            connect_timeout_secs: 10,
            transfer_timeout_secs: 300,
            fetch_parallelism: None,
            rewrite_parallelism: None,
            user_agent: None,
        }
    }
}

impl EngineConfig {
    /// Concrete fetch options, filling unset fields from the built-in
    /// defaults.
    pub fn fetch_options(&self) -> FetchOptions {
        let defaults = FetchOptions::default();
        FetchOptions {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            transfer_timeout: Duration::from_secs(self.transfer_timeout_secs),
            fetch_parallelism: self.fetch_parallelism.unwrap_or(defaults.fetch_parallelism),
            rewrite_parallelism: self
                .rewrite_parallelism
                .unwrap_or(defaults.rewrite_parallelism),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hoist")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}
