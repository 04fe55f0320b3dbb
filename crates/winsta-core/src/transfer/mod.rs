//! Guarded stream copy: source → destination with a running SHA-256, a
//! throughput floor, and caller-driven cancellation.
//!
//! The reader future is the only thing that touches the digest and the
//! destination, so bytes are hashed and written in stream order. The
//! coordinator polls it alongside the cancellation token and the stall
//! monitor and stops at whichever settles first. Losing futures are dropped
//! on the way out, which also stops the timer and any in-flight I/O.

mod counter;
mod error;
mod stall;

pub use counter::TransferCounter;
pub use error::{CopyError, CopyErrorKind};
pub use stall::{StallMonitor, StallPolicy, DEFAULT_INTERVAL, DEFAULT_MIN_BYTES_PER_INTERVAL};

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::checksum::{DigestAccumulator, ExpectedDigest, Sha256Digest};

/// Default read size for one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub chunk_size: usize,
    pub stall: StallPolicy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            stall: StallPolicy::default(),
        }
    }
}

/// Outcome of one guarded copy. `bytes_written` is accurate on every path,
/// so the caller can decide what to do with a partial file.
#[derive(Debug)]
pub struct CopyReport {
    pub bytes_written: u64,
    pub status: Result<Sha256Digest, CopyError>,
}

impl CopyReport {
    pub fn into_result(self) -> Result<(u64, Sha256Digest), CopyError> {
        self.status.map(|digest| (self.bytes_written, digest))
    }
}

/// Copy `src` into `dst` until end-of-stream, then check the digest against `expected`.
///
/// Stops early with `Cancelled` when `cancel` fires, `Stalled` when the stall
/// policy is violated, or `Io` on the first read/write failure. The
/// destination is flushed before the digest is compared; syncing and closing
/// it stay with the caller.
pub async fn copy_verified<R, W>(
    cancel: &CancellationToken,
    dst: &mut W,
    src: &mut R,
    expected: &ExpectedDigest,
    options: &TransferOptions,
) -> CopyReport
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let counter = TransferCounter::new();
    let mut monitor = StallMonitor::new(options.stall);
    let pump = pump(src, dst, &counter, options.chunk_size.max(1));
    tokio::pin!(pump);

    let status = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(bytes = counter.snapshot(), "transfer cancelled");
                break Err(CopyError::Cancelled);
            }
            res = &mut pump => {
                break res.and_then(|digest| expected.verify(&digest).map(|()| digest));
            }
            _ = monitor.tick() => {
                let current = counter.snapshot();
                if let Err(e) = monitor.check(current) {
                    tracing::warn!(bytes = current, "{}", e);
                    break Err(e);
                }
                tracing::debug!(bytes = current, "transfer progressing");
            }
        }
    };

    CopyReport {
        bytes_written: counter.snapshot(),
        status,
    }
}

/// Reader side: read a chunk, hash it, write and count it; repeat until EOF.
async fn pump<R, W>(
    src: &mut R,
    dst: &mut W,
    counter: &TransferCounter,
    chunk_size: usize,
) -> Result<Sha256Digest, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut acc = DigestAccumulator::new();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        acc.update(&buf[..n]);
        // Count each accepted slice so a failing sink still reports what it took.
        let mut rest = &buf[..n];
        while !rest.is_empty() {
            let written = dst.write(rest).await?;
            if written == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            counter.add(written as u64);
            rest = &rest[written..];
        }
    }
    dst.flush().await?;
    Ok(acc.finalize())
}
