//! `winsta download` – fetch and verify the latest installer to a chosen path.

use anyhow::Result;
use std::path::Path;
use winsta_core::config::WinstaConfig;
use winsta_core::pipeline;
use winsta_core::release::Quality;

use super::CtrlCGuard;

pub async fn run_download(cfg: &WinstaConfig, quality: Quality, output: &Path) -> Result<()> {
    let guard = CtrlCGuard::install();

    let summary = pipeline::download_latest(cfg, quality, output, guard.token()).await?;

    println!(
        "Downloaded {} to {} ({} bytes, sha256 verified)",
        summary.release.name,
        summary.path.display(),
        summary.bytes
    );
    Ok(())
}
