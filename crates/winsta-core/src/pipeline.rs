//! End-to-end runs: look up the latest release, download it with the guarded
//! copy, and optionally run it.
//!
//! Each run is split into stages so a failure can be reported as "which step
//! broke" rather than a bare transport error.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::checksum::ExpectedDigest;
use crate::config::WinstaConfig;
use crate::control::{is_cancellation, until_cancelled};
use crate::fetch::{self, HttpOptions};
use crate::installer;
use crate::platform;
use crate::release::{self, Quality, ReleaseInfo};
use crate::storage::StagedFile;
use crate::transfer::{self, TransferOptions};
use crate::workdir::InstallerDir;

/// Step of a run, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Release,
    Download,
    Install,
    Cleanup,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Release => "release",
            Stage::Download => "download",
            Stage::Install => "install",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run failed in `stage`.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: Stage,
    pub error: anyhow::Error,
}

impl PipelineError {
    /// True when the run stopped because its token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        is_cancellation(&self.error)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed", self.stage)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|error| PipelineError { stage, error })
    }
}

/// Everything a single download needs besides its URL and digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub http: HttpOptions,
    pub transfer: TransferOptions,
    /// Reject plain `http://` download URLs.
    pub require_https: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            http: HttpOptions::default(),
            transfer: TransferOptions::default(),
            require_https: true,
        }
    }
}

/// Accept `https` always and `http` only when `require_https` is off.
fn check_url_policy(raw: &str, require_https: bool) -> Result<()> {
    let url = url::Url::parse(raw).with_context(|| format!("invalid download URL: {}", raw))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if !require_https => Ok(()),
        "http" => anyhow::bail!("refusing non-HTTPS download URL: {}", raw),
        other => anyhow::bail!("unsupported URL scheme {:?}: {}", other, raw),
    }
}

/// Download `url` to `final_path`, verifying its SHA-256 against `expected_hex`.
///
/// The digest and URL are checked before any I/O. Bytes go to
/// `<final_path>.part`, which is renamed into place only after the digest
/// matched; on any failure it is removed. Returns the number of bytes written.
pub async fn download_verified(
    url: &str,
    expected_hex: &str,
    final_path: &Path,
    settings: &DownloadSettings,
    cancel: &CancellationToken,
) -> Result<u64> {
    let expected = ExpectedDigest::from_hex(expected_hex).context("invalid expected sha256")?;
    check_url_policy(url, settings.require_https)?;

    tracing::info!(url, dest = %final_path.display(), "downloading");
    let mut staged = StagedFile::create(final_path).await?;

    let mut body = match until_cancelled(cancel, fetch::open_body(url, &settings.http)).await {
        Ok(body) => body,
        Err(e) => {
            discard_quietly(staged).await;
            return Err(e);
        }
    };
    tracing::debug!(
        status = body.status(),
        content_length = ?body.content_length(),
        "streaming response body"
    );

    let report = transfer::copy_verified(
        cancel,
        staged.file_mut(),
        &mut body,
        &expected,
        &settings.transfer,
    )
    .await;
    drop(body);

    match report.status {
        Ok(digest) => {
            let path = staged.finalize().await?;
            tracing::info!(
                bytes = report.bytes_written,
                sha256 = %digest,
                path = %path.display(),
                "download verified"
            );
            Ok(report.bytes_written)
        }
        Err(e) => {
            discard_quietly(staged).await;
            Err(anyhow::Error::new(e)).with_context(|| {
                format!("download of {} stopped after {} bytes", url, report.bytes_written)
            })
        }
    }
}

async fn discard_quietly(staged: StagedFile) {
    let temp = staged.temp_path().to_path_buf();
    if let Err(e) = staged.discard().await {
        tracing::warn!(path = %temp.display(), "could not remove partial download: {:#}", e);
    }
}

/// Result of [`install_latest`].
#[derive(Debug, Clone)]
pub struct InstallSummary {
    pub release: ReleaseInfo,
    pub bytes: u64,
    /// Installer stdout.
    pub installer_output: String,
}

/// Result of [`download_latest`].
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    pub release: ReleaseInfo,
    pub path: PathBuf,
    pub bytes: u64,
}

async fn resolve_release(
    config: &WinstaConfig,
    arch_pkg: &str,
    quality: Quality,
    cancel: &CancellationToken,
) -> Result<ReleaseInfo> {
    let api_url = release::release_api_url(&config.update_api_base, arch_pkg, quality);
    until_cancelled(
        cancel,
        release::fetch_release_info(&api_url, &config.http_options(), config.metadata_timeout()),
    )
    .await
    .with_context(|| format!("release lookup at {}", api_url))
}

/// Download the latest `quality` installer for this machine into a scratch
/// directory, run it silently, then remove the directory.
pub async fn install_latest(
    config: &WinstaConfig,
    quality: Quality,
    cancel: &CancellationToken,
) -> Result<InstallSummary, PipelineError> {
    config.validate().stage(Stage::Setup)?;
    let arch_pkg = platform::arch_package().stage(Stage::Setup)?;
    let dir = InstallerDir::create(quality).stage(Stage::Setup)?;
    tracing::info!(%quality, arch_pkg, dir = %dir.path().display(), "install started");

    let release = resolve_release(config, arch_pkg, quality, cancel)
        .await
        .stage(Stage::Release)?;

    let installer_path = dir.installer_path(arch_pkg);
    let bytes = download_verified(
        &release.url,
        &release.sha256_hash,
        &installer_path,
        &config.download_settings(),
        cancel,
    )
    .await
    .stage(Stage::Download)?;

    let args = config.installer_args();
    let installer_output = until_cancelled(cancel, installer::run_installer(&installer_path, &args))
        .await
        .stage(Stage::Install)?;

    dir.cleanup().stage(Stage::Cleanup)?;
    tracing::info!(name = %release.name, "install finished");
    Ok(InstallSummary {
        release,
        bytes,
        installer_output,
    })
}

/// Download the latest `quality` installer for this machine to `output`
/// without running it.
pub async fn download_latest(
    config: &WinstaConfig,
    quality: Quality,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<DownloadSummary, PipelineError> {
    config.validate().stage(Stage::Setup)?;
    let arch_pkg = platform::arch_package().stage(Stage::Setup)?;

    let release = resolve_release(config, arch_pkg, quality, cancel)
        .await
        .stage(Stage::Release)?;

    let bytes = download_verified(
        &release.url,
        &release.sha256_hash,
        output,
        &config.download_settings(),
        cancel,
    )
    .await
    .stage(Stage::Download)?;

    Ok(DownloadSummary {
        release,
        path: output.to_path_buf(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::CopyError;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn url_policy() {
        assert!(check_url_policy("https://update.code.visualstudio.com/x.exe", true).is_ok());
        assert!(check_url_policy("http://127.0.0.1:9/x.exe", false).is_ok());
        let err = check_url_policy("http://example.com/x.exe", true).unwrap_err();
        assert!(err.to_string().contains("non-HTTPS"));
        assert!(check_url_policy("ftp://example.com/x.exe", false).is_err());
        assert!(check_url_policy("not a url", false).is_err());
    }

    #[test]
    fn error_message_names_stage() {
        let err: Result<(), PipelineError> =
            Err(anyhow::anyhow!("HTTP 503")).stage(Stage::Release);
        let err = err.unwrap_err();
        assert_eq!(err.to_string(), "release stage failed");
        let wrapped = anyhow::Error::new(err);
        assert_eq!(format!("{:#}", wrapped), "release stage failed: HTTP 503");
    }

    #[test]
    fn cancelled_copy_is_reported_as_cancelled() {
        let err = PipelineError {
            stage: Stage::Download,
            error: anyhow::Error::new(CopyError::Cancelled).context("download of x stopped"),
        };
        assert!(err.is_cancelled());
        let err = PipelineError {
            stage: Stage::Download,
            error: anyhow::anyhow!("HTTP 404"),
        };
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn bad_digest_is_rejected_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("setup.exe");
        let err = download_verified(
            "https://127.0.0.1:1/never-contacted.exe",
            "not-hex",
            &dest,
            &DownloadSettings::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CopyError>(),
            Some(CopyError::Decode(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn insecure_url_is_rejected_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("setup.exe");
        let err = download_verified(
            "http://127.0.0.1:1/setup.exe",
            EMPTY_SHA256,
            &dest,
            &DownloadSettings::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("non-HTTPS"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_connect_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("setup.exe");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let settings = DownloadSettings {
            require_https: false,
            ..DownloadSettings::default()
        };
        let err = download_verified("http://127.0.0.1:1/setup.exe", EMPTY_SHA256, &dest, &settings, &cancel)
            .await
            .unwrap_err();
        assert!(is_cancellation(&err));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
