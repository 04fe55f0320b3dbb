//! Checksum command: compute SHA-256 of a file, optionally comparing it.

use anyhow::{Context, Result};
use std::path::Path;
use winsta_core::checksum::{self, ExpectedDigest};

/// Compute and print SHA-256 of the given file. With `expect`, fail unless it matches.
pub async fn run_checksum(path: &Path, expect: Option<&str>) -> Result<()> {
    let expected = expect
        .map(ExpectedDigest::from_hex)
        .transpose()
        .context("invalid --expect digest")?;

    let owned = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || checksum::sha256_path(&owned))
        .await
        .context("checksum task panicked")??;
    println!("{}  {}", digest, path.display());

    if let Some(expected) = expected {
        if expected.digest().to_hex() != digest {
            anyhow::bail!(
                "checksum mismatch for {}: expected {}, got {}",
                path.display(),
                expected.digest(),
                digest
            );
        }
        println!("OK");
    }
    Ok(())
}
