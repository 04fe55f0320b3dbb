//! Release lookup against the VS Code update API.

mod parse;

pub use parse::ReleaseInfo;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::{self, HttpOptions};

/// Base of the update API; the full URL is built by [`release_api_url`].
pub const DEFAULT_UPDATE_API_BASE: &str = "https://update.code.visualstudio.com/api/update";

/// Total time allowed for the metadata request.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Release channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Stable,
    Insider,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Stable => "stable",
            Quality::Insider => "insider",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown quality {0:?} (expected \"stable\" or \"insider\")")]
pub struct UnknownQuality(String);

impl FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Quality::Stable),
            "insider" | "insiders" => Ok(Quality::Insider),
            _ => Err(UnknownQuality(s.to_string())),
        }
    }
}

/// `{base}/win32-{arch_pkg}/{quality}/latest`
pub fn release_api_url(base: &str, arch_pkg: &str, quality: Quality) -> String {
    format!(
        "{}/win32-{}/{}/latest",
        base.trim_end_matches('/'),
        arch_pkg,
        quality
    )
}

/// Fetch and validate the release record at `api_url`.
pub async fn fetch_release_info(
    api_url: &str,
    http: &HttpOptions,
    timeout: Duration,
) -> Result<ReleaseInfo> {
    tracing::debug!(api_url, "fetching release info");
    let url = api_url.to_string();
    let options = http.clone();
    let bytes = tokio::task::spawn_blocking(move || fetch::get_bytes(&url, &options, timeout))
        .await
        .context("release fetch task panicked")??;
    let info = parse::parse_release_info(&bytes)
        .with_context(|| format!("invalid release info from {}", api_url))?;
    tracing::info!(name = %info.name, url = %info.url, "latest release");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_layout() {
        assert_eq!(
            release_api_url(DEFAULT_UPDATE_API_BASE, "x64-user", Quality::Stable),
            "https://update.code.visualstudio.com/api/update/win32-x64-user/stable/latest"
        );
        assert_eq!(
            release_api_url("http://127.0.0.1:8080/api/", "arm64-user", Quality::Insider),
            "http://127.0.0.1:8080/api/win32-arm64-user/insider/latest"
        );
    }

    #[test]
    fn quality_from_text() {
        assert_eq!("stable".parse::<Quality>().unwrap(), Quality::Stable);
        assert_eq!(" Insider ".parse::<Quality>().unwrap(), Quality::Insider);
        assert_eq!("insiders".parse::<Quality>().unwrap(), Quality::Insider);
        let err = "nightly".parse::<Quality>().unwrap_err();
        assert!(err.to_string().contains("nightly"));
    }

    #[test]
    fn quality_serde_is_lowercase() {
        #[derive(Serialize, Deserialize)]
        struct Wrap {
            quality: Quality,
        }
        let text = toml::to_string(&Wrap {
            quality: Quality::Insider,
        })
        .unwrap();
        assert_eq!(text.trim(), r#"quality = "insider""#);
        let back: Wrap = toml::from_str(r#"quality = "stable""#).unwrap();
        assert_eq!(back.quality, Quality::Stable);
    }
}
