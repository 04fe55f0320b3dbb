//! `winsta install` – fetch, verify and run the latest installer.

use anyhow::Result;
use winsta_core::config::WinstaConfig;
use winsta_core::pipeline;
use winsta_core::release::Quality;

use super::CtrlCGuard;

pub async fn run_install(cfg: &WinstaConfig, quality: Quality) -> Result<()> {
    let guard = CtrlCGuard::install();
    println!("Installing latest {} build...", quality);

    let summary = pipeline::install_latest(cfg, quality, guard.token()).await?;

    let output = summary.installer_output.trim();
    if !output.is_empty() {
        println!("{}", output);
    }
    println!(
        "Installed {} ({:.1} MiB, sha256 {})",
        summary.release.name,
        summary.bytes as f64 / 1_048_576.0,
        summary.release.sha256_hash.to_ascii_lowercase()
    );
    Ok(())
}
