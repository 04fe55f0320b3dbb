//! Destination file lifecycle.
//!
//! Bytes are written to `<final>.part`; the final name only appears after a
//! flush, fsync and rename. A failed or unverified download never shows up
//! under the final name.

mod staged;

pub use staged::StagedFile;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Return the temp path for a given final path (`final_path` + [`TEMP_SUFFIX`]).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}
