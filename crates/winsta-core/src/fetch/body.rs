//! Streaming GET: libcurl runs on a blocking thread and pushes body chunks
//! through a bounded channel; `HttpBody` reads them back as `AsyncRead`.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io;
use std::pin::Pin;
use std::str;
use std::task::{ready, Context as TaskContext, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{mpsc, oneshot};

use super::parse::{HeaderBlock, ResponseHead};
use super::{new_easy, HttpOptions};

/// Chunks buffered between the curl thread and the reader.
const BODY_CHANNEL_CAPACITY: usize = 16;

type HeadSender = oneshot::Sender<Result<ResponseHead>>;
type ChunkSender = mpsc::Sender<io::Result<Vec<u8>>>;

/// Response body of a successful GET. Dropping it aborts the transfer.
#[derive(Debug)]
pub struct HttpBody {
    head: ResponseHead,
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
}

impl HttpBody {
    fn new(head: ResponseHead, rx: mpsc::Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            head,
            rx,
            pending: Vec::new(),
            pos: 0,
        }
    }

    pub fn status(&self) -> u32 {
        self.head.status
    }

    /// `Content-Length` of the final response, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length
    }
}

impl AsyncRead for HttpBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if this.pos < this.pending.len() {
                let n = (this.pending.len() - this.pos).min(buf.remaining());
                buf.put_slice(&this.pending[this.pos..this.pos + n]);
                this.pos += n;
                return Poll::Ready(Ok(()));
            }
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.pending = chunk;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Sender dropped after a clean finish: end of stream.
                None => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Start a GET for `url` and wait for the final response head.
///
/// Fails if the request cannot be made, the head does not arrive within
/// `connect_timeout + response_header_timeout`, or the final status is not 2xx. On
/// success the body is streamed lazily; no overall timeout applies to it.
pub async fn open_body(url: &str, options: &HttpOptions) -> Result<HttpBody> {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

    let thread_url = url.to_string();
    let thread_options = options.clone();
    tokio::task::spawn_blocking(move || {
        stream_transfer(&thread_url, &thread_options, head_tx, body_tx);
    });

    // The header window starts after the connect window. On timeout
    // `body_rx` is dropped with us, which aborts the curl thread through its
    // progress callback.
    let wait = options.connect_timeout + options.response_header_timeout;
    let head = tokio::time::timeout(wait, head_rx)
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "no response head from {} within {:?} of connecting",
                url,
                options.response_header_timeout
            )
        })?
        .context("transfer thread exited before the response head")??;
    if !head.is_success() {
        anyhow::bail!("GET {} returned HTTP {}", url, head.status);
    }
    tracing::debug!(url, status = head.status, content_length = ?head.content_length, "response head received");
    Ok(HttpBody::new(head, body_rx))
}

/// Body of the blocking thread: run the transfer and route its outcome to
/// whichever side is still waiting (head or body).
fn stream_transfer(url: &str, options: &HttpOptions, head_tx: HeadSender, body_tx: ChunkSender) {
    let head_tx = RefCell::new(Some(head_tx));
    let outcome = perform_streaming(url, options, &head_tx, &body_tx);

    match (outcome, head_tx.into_inner()) {
        (Ok(()), None) => {}
        (Ok(()), Some(tx)) => {
            let _ = tx.send(Err(anyhow::anyhow!(
                "GET {} ended before the response head was complete",
                url
            )));
        }
        (Err(e), Some(tx)) => {
            let _ = tx.send(Err(e));
        }
        (Err(e), None) => {
            if body_tx.is_closed() {
                tracing::debug!(url, "body dropped by reader; transfer aborted");
            } else {
                let _ = body_tx.blocking_send(Err(io::Error::other(format!("{:#}", e))));
            }
        }
    }
}

fn perform_streaming(
    url: &str,
    options: &HttpOptions,
    head_tx: &RefCell<Option<HeadSender>>,
    body_tx: &ChunkSender,
) -> Result<()> {
    let mut easy = new_easy(url, options)?;
    // Progress callbacks fire about once a second even while idle, which lets
    // a dropped reader abort a transfer that is waiting on the network.
    easy.progress(true)?;

    let mut block = HeaderBlock::default();
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        let Ok(line) = str::from_utf8(data) else {
            return true;
        };
        match block.feed(line) {
            Some(head) => {
                let proceed = head.is_success();
                if let Some(tx) = head_tx.borrow_mut().take() {
                    let _ = tx.send(Ok(head));
                }
                proceed
            }
            None => true,
        }
    })?;
    transfer.write_function(|data| match body_tx.blocking_send(Ok(data.to_vec())) {
        Ok(()) => Ok(data.len()),
        Err(_) => Ok(0), // reader gone: abort transfer
    })?;
    transfer.progress_function(|_, _, _, _| !body_tx.is_closed())?;
    transfer.perform().context("GET request failed")?;
    Ok(())
}
