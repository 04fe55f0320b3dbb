//! Scratch directory for one install run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::release::Quality;

/// Fresh directory under the system temp dir. Removed by [`InstallerDir::cleanup`],
/// or on drop if the run bails out before reaching it.
#[derive(Debug)]
pub struct InstallerDir {
    dir: TempDir,
}

impl InstallerDir {
    pub fn create(quality: Quality) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), quality)
    }

    pub fn create_in(parent: &Path, quality: Quality) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("winsta-{}-", quality))
            .tempdir_in(parent)
            .with_context(|| format!("failed to create installer dir in {}", parent.display()))?;
        tracing::debug!(dir = %dir.path().display(), "created installer dir");
        Ok(InstallerDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the installer for `arch_pkg` is placed, e.g. `vscode-win32-x64-user.exe`.
    pub fn installer_path(&self, arch_pkg: &str) -> PathBuf {
        self.dir.path().join(format!("vscode-win32-{}.exe", arch_pkg))
    }

    /// Remove the directory and everything in it, reporting failures.
    pub fn cleanup(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove {}", path.display()))?;
        tracing::debug!(dir = %path.display(), "removed installer dir");
        Ok(())
    }
}
