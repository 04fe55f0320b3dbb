//! Runs the downloaded installer.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Silent install, without launching the editor afterwards.
pub const DEFAULT_INSTALLER_ARGS: &[&str] = &["/verysilent", "/mergetasks=!runcode"];

/// Arguments as owned strings, for config defaults.
pub fn default_installer_args() -> Vec<String> {
    DEFAULT_INSTALLER_ARGS.iter().map(|s| s.to_string()).collect()
}

/// Run `path` with `args` and wait for it. Output is captured and logged;
/// stdout is returned. A non-zero exit is an error carrying the status and stderr.
pub async fn run_installer(path: &Path, args: &[String]) -> Result<String> {
    tracing::info!(installer = %path.display(), ?args, "running installer");
    let output = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to start installer {}", path.display()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        tracing::debug!(stdout = %stdout.trim_end(), "installer output");
    }
    if !stderr.trim().is_empty() {
        tracing::debug!(stderr = %stderr.trim_end(), "installer stderr");
    }

    if !output.status.success() {
        anyhow::bail!(
            "installer exited with {}{}",
            output.status,
            if stderr.trim().is_empty() {
                String::new()
            } else {
                format!(": {}", stderr.trim())
            }
        );
    }
    tracing::info!("installer finished");
    Ok(stdout)
}
