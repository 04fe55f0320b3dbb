//! SHA-256 digests: the streaming accumulator fed by the copy loop, the
//! caller-supplied expected digest, and on-demand hashing of files on disk.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::transfer::CopyError;

const BUF_SIZE: usize = 64 * 1024;

/// Length in bytes of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Final output of a [`DigestAccumulator`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; DIGEST_LEN]);

impl Sha256Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Digest({})", self.to_hex())
    }
}

/// Running SHA-256 state. Bytes must be fed in stream order.
///
/// `finalize` consumes the accumulator, so it cannot be reused after the
/// digest has been produced.
#[derive(Default)]
pub struct DigestAccumulator {
    hasher: Sha256,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finalize(self) -> Sha256Digest {
        Sha256Digest(self.hasher.finalize().into())
    }
}

/// Digest the downloaded bytes must match, decoded from its hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedDigest(Sha256Digest);

impl ExpectedDigest {
    /// Decode a 64-character hex string (either case, surrounding whitespace ignored).
    pub fn from_hex(text: &str) -> Result<Self, CopyError> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(text.trim(), &mut bytes).map_err(CopyError::Decode)?;
        Ok(Self(Sha256Digest(bytes)))
    }

    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(Sha256Digest(bytes))
    }

    pub fn digest(&self) -> &Sha256Digest {
        &self.0
    }

    /// Exact comparison over the full digest length.
    pub fn verify(&self, actual: &Sha256Digest) -> Result<(), CopyError> {
        if self.0.as_bytes() == actual.as_bytes() {
            Ok(())
        } else {
            Err(CopyError::IntegrityMismatch {
                expected: self.0,
                actual: *actual,
            })
        }
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut acc = DigestAccumulator::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        acc.update(&buf[..n]);
    }
    Ok(acc.finalize().to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::CopyErrorKind;
    use std::io::Write;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO_NL_SHA256: &str =
        "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn sha256_path_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(digest, EMPTY_SHA256);
    }

    #[test]
    fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(digest, HELLO_NL_SHA256);
    }

    #[test]
    fn accumulator_is_insensitive_to_chunking() {
        let mut whole = DigestAccumulator::new();
        whole.update(b"hello\n");

        let mut split = DigestAccumulator::new();
        split.update(b"he");
        split.update(b"");
        split.update(b"llo\n");

        let a = whole.finalize();
        let b = split.finalize();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), HELLO_NL_SHA256);
    }

    #[test]
    fn expected_digest_accepts_uppercase_and_whitespace() {
        let text = format!("  {}\n", HELLO_NL_SHA256.to_uppercase());
        let expected = ExpectedDigest::from_hex(&text).unwrap();
        assert_eq!(expected.digest().to_hex(), HELLO_NL_SHA256);
    }

    #[test]
    fn expected_digest_rejects_bad_input() {
        let too_long = format!("{HELLO_NL_SHA256}00");
        let bad_inputs: [&str; 5] = ["", "abc", "zz", &HELLO_NL_SHA256[..62], too_long.as_str()];
        for bad in bad_inputs {
            let err = ExpectedDigest::from_hex(bad).unwrap_err();
            assert_eq!(err.kind(), CopyErrorKind::Decode, "input {bad:?}");
        }
        let non_hex = format!("{}g", &HELLO_NL_SHA256[..63]);
        let err = ExpectedDigest::from_hex(&non_hex).unwrap_err();
        assert_eq!(err.kind(), CopyErrorKind::Decode);
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        let expected = ExpectedDigest::from_hex(EMPTY_SHA256).unwrap();
        let mut acc = DigestAccumulator::new();
        acc.update(b"hello\n");
        let actual = acc.finalize();

        match expected.verify(&actual) {
            Err(CopyError::IntegrityMismatch { expected: e, actual: a }) => {
                assert_eq!(e.to_hex(), EMPTY_SHA256);
                assert_eq!(a.to_hex(), HELLO_NL_SHA256);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        assert!(expected.verify(&DigestAccumulator::new().finalize()).is_ok());
    }
}
