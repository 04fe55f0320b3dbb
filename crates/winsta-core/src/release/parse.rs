//! Update-API response body.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Latest installer for one platform/quality pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Direct download URL of the installer.
    pub url: String,
    /// Version name, e.g. `1.93.1`.
    pub name: String,
    /// Lowercase or uppercase hex SHA-256 of the installer.
    pub sha256_hash: String,
}

/// Wire shape; every field is optional here so that a missing one is reported
/// by us rather than as a serde error.
#[derive(Debug, Deserialize)]
struct RawRelease {
    url: Option<String>,
    name: Option<String>,
    #[serde(rename = "sha256hash")]
    sha256_hash: Option<String>,
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn parse_release_info(bytes: &[u8]) -> Result<ReleaseInfo> {
    let raw: RawRelease = serde_json::from_slice(bytes).context("parse release JSON")?;
    match (required(raw.url), required(raw.name), required(raw.sha256_hash)) {
        (Some(url), Some(name), Some(sha256_hash)) => Ok(ReleaseInfo {
            url,
            name,
            sha256_hash,
        }),
        _ => anyhow::bail!("release info is missing required fields (url, name, sha256hash)"),
    }
}
