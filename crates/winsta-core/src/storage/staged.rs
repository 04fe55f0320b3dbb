//! Async sink for one download.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::temp_path;

/// A `.part` file that becomes `final_path` only on [`StagedFile::finalize`].
#[derive(Debug)]
pub struct StagedFile {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl StagedFile {
    /// Create (or truncate) `<final_path>.part`. The parent directory must exist.
    pub async fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(StagedFile {
            file,
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    /// Writable handle for the copy.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, fsync and rename to the final path. Replaces an existing file there.
    pub async fn finalize(mut self) -> Result<PathBuf> {
        self.file.flush().await.context("flush staged file")?;
        self.file.sync_all().await.context("storage sync failed")?;
        drop(self.file);

        tokio::fs::rename(&self.temp_path, &self.final_path)
            .await
            .with_context(|| {
                format!(
                    "failed to rename {} to {}",
                    self.temp_path.display(),
                    self.final_path.display()
                )
            })?;
        Ok(self.final_path)
    }

    /// Close and delete the partial file.
    pub async fn discard(self) -> Result<()> {
        drop(self.file);
        match tokio::fs::remove_file(&self.temp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove {}", self.temp_path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finalize_renames_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("setup.exe");

        let mut staged = StagedFile::create(&final_path).await.unwrap();
        assert_eq!(staged.temp_path(), dir.path().join("setup.exe.part"));
        staged.file_mut().write_all(b"MZ installer").await.unwrap();
        assert!(!final_path.exists());

        let out = staged.finalize().await.unwrap();
        assert_eq!(out, final_path);
        assert_eq!(std::fs::read(&final_path).unwrap(), b"MZ installer");
        assert!(!dir.path().join("setup.exe.part").exists());
    }

    #[tokio::test]
    async fn discard_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("setup.exe");

        let mut staged = StagedFile::create(&final_path).await.unwrap();
        staged.file_mut().write_all(b"partial").await.unwrap();
        staged.discard().await.unwrap();

        assert!(!final_path.exists());
        assert!(!dir.path().join("setup.exe.part").exists());
    }

    #[tokio::test]
    async fn create_truncates_stale_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("setup.exe");
        std::fs::write(dir.path().join("setup.exe.part"), b"stale bytes from last run").unwrap();

        let mut staged = StagedFile::create(&final_path).await.unwrap();
        staged.file_mut().write_all(b"new").await.unwrap();
        staged.finalize().await.unwrap();
        assert_eq!(std::fs::read(&final_path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn missing_parent_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("no-such-dir").join("setup.exe");
        let err = StagedFile::create(&final_path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to create temp file"));
    }
}
