use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::{HttpOptions, DEFAULT_USER_AGENT};
use crate::installer;
use crate::pipeline::DownloadSettings;
use crate::release::{Quality, DEFAULT_UPDATE_API_BASE};
use crate::transfer::{StallPolicy, TransferOptions, DEFAULT_CHUNK_SIZE};

/// Stall detection parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallConfig {
    /// Seconds between throughput checks.
    pub interval_secs: u64,
    /// Bytes that must arrive in each interval.
    pub min_bytes_per_interval: u64,
}

impl Default for StallConfig {
    fn default() -> Self {
        let policy = StallPolicy::default();
        Self {
            interval_secs: policy.interval.as_secs(),
            min_bytes_per_interval: policy.min_bytes_per_interval,
        }
    }
}

/// Global configuration loaded from `~/.config/winsta/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinstaConfig {
    /// Channel used when the command line does not pick one.
    pub quality: Quality,
    /// Update API base URL; `/win32-{arch}/{quality}/latest` is appended.
    pub update_api_base: String,
    pub user_agent: String,
    /// TCP connect + TLS handshake limit for every request.
    pub connect_timeout_secs: u64,
    /// Wait limit for the installer response head once connected.
    pub response_header_timeout_secs: u64,
    /// Total time allowed for the release metadata request.
    pub metadata_timeout_secs: u64,
    /// Refuse plain-HTTP installer URLs.
    pub require_https: bool,
    /// Optional read size per chunk in bytes (None = library default).
    pub chunk_size_bytes: Option<usize>,
    /// Optional installer arguments (None = `/verysilent /mergetasks=!runcode`).
    pub installer_args: Option<Vec<String>>,
    /// Optional stall policy; if missing, built-in defaults are used.
    pub stall: Option<StallConfig>,
}

impl Default for WinstaConfig {
    fn default() -> Self {
        Self {
            quality: Quality::Stable,
            update_api_base: DEFAULT_UPDATE_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 30,
            response_header_timeout_secs: 15,
            metadata_timeout_secs: 30,
            require_https: true,
            chunk_size_bytes: None,
            installer_args: None,
            stall: None,
        }
    }
}

impl WinstaConfig {
    /// Reject values that would disable a timeout or the stall check.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("connect_timeout_secs must be greater than zero");
        }
        if self.response_header_timeout_secs == 0 {
            anyhow::bail!("response_header_timeout_secs must be greater than zero");
        }
        if self.metadata_timeout_secs == 0 {
            anyhow::bail!("metadata_timeout_secs must be greater than zero");
        }
        if let Some(stall) = &self.stall {
            if stall.interval_secs == 0 {
                anyhow::bail!("stall.interval_secs must be greater than zero");
            }
        }
        if self.chunk_size_bytes == Some(0) {
            anyhow::bail!("chunk_size_bytes must be greater than zero");
        }
        url::Url::parse(&self.update_api_base)
            .with_context(|| format!("invalid update_api_base: {}", self.update_api_base))?;
        Ok(())
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            response_header_timeout: Duration::from_secs(self.response_header_timeout_secs),
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        let stall = self.stall.clone().unwrap_or_default();
        TransferOptions {
            chunk_size: self.chunk_size_bytes.unwrap_or(DEFAULT_CHUNK_SIZE),
            stall: StallPolicy {
                interval: Duration::from_secs(stall.interval_secs),
                min_bytes_per_interval: stall.min_bytes_per_interval,
            },
        }
    }

    pub fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            http: self.http_options(),
            transfer: self.transfer_options(),
            require_https: self.require_https,
        }
    }

    pub fn installer_args(&self) -> Vec<String> {
        self.installer_args
            .clone()
            .unwrap_or_else(installer::default_installer_args)
    }
}

#[cfg(unix)]
pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("winsta")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

#[cfg(windows)]
pub fn config_path() -> Result<PathBuf> {
    let appdata = std::env::var_os("APPDATA").context("APPDATA is not set")?;
    Ok(PathBuf::from(appdata).join("winsta").join("config.toml"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WinstaConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<WinstaConfig> {
    if !path.exists() {
        let default_cfg = WinstaConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: WinstaConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}
