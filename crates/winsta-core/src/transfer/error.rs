//! Terminal outcomes of a guarded copy.

use std::time::Duration;

use crate::checksum::Sha256Digest;

/// Why a guarded copy stopped. Every variant is terminal; nothing is retried
/// inside the copier.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Expected digest text was not 64 hex characters.
    #[error("invalid expected digest: {0}")]
    Decode(#[source] hex::FromHexError),

    /// Reading the source or writing the destination failed.
    #[error("transfer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// All bytes arrived but their digest is not the expected one.
    #[error("integrity verification failed: expected sha256 {expected}, got {actual}")]
    IntegrityMismatch {
        expected: Sha256Digest,
        actual: Sha256Digest,
    },

    /// Fewer bytes than the throughput floor arrived within one interval.
    #[error("stream stalled: received {received} bytes over the last {} seconds", .interval.as_secs_f64())]
    Stalled { received: u64, interval: Duration },

    /// The caller cancelled the transfer.
    #[error("transfer cancelled")]
    Cancelled,
}

/// Field-less discriminant of [`CopyError`], for matching and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyErrorKind {
    Decode,
    Io,
    IntegrityMismatch,
    Stalled,
    Cancelled,
}

impl CopyError {
    pub fn kind(&self) -> CopyErrorKind {
        match self {
            CopyError::Decode(_) => CopyErrorKind::Decode,
            CopyError::Io(_) => CopyErrorKind::Io,
            CopyError::IntegrityMismatch { .. } => CopyErrorKind::IntegrityMismatch,
            CopyError::Stalled { .. } => CopyErrorKind::Stalled,
            CopyError::Cancelled => CopyErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalled_message_names_bytes_and_interval() {
        let err = CopyError::Stalled {
            received: 12,
            interval: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "stream stalled: received 12 bytes over the last 5 seconds"
        );
        assert_eq!(err.kind(), CopyErrorKind::Stalled);
    }

    #[test]
    fn io_error_keeps_its_source() {
        let err = CopyError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer reset",
        ));
        assert_eq!(err.kind(), CopyErrorKind::Io);
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "peer reset");
    }
}
