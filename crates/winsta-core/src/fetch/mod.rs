//! HTTP GET over libcurl.
//!
//! Two entry points: `get_bytes` for small bounded responses (release
//! metadata) and `open_body` for the installer itself, which hands back a
//! streaming `AsyncRead` once the final response head is known. Neither
//! retries; both follow redirects.

mod body;
mod parse;

pub use body::{open_body, HttpBody};
pub use parse::ResponseHead;

use anyhow::{Context, Result};
use std::time::Duration;

/// Upper bound for `get_bytes` responses.
pub const MAX_SMALL_BODY: usize = 4 * 1024 * 1024;

/// User-Agent sent when nothing else is configured.
pub const DEFAULT_USER_AGENT: &str = "cli/vscode-winsta11er";

const MAX_REDIRECTS: u32 = 10;

/// Transport settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    pub user_agent: String,
    /// Time allowed for TCP connect + TLS handshake.
    pub connect_timeout: Duration,
    /// Time `open_body` waits for the final response head, on top of
    /// `connect_timeout`.
    pub response_header_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(30),
            response_header_timeout: Duration::from_secs(15),
        }
    }
}

/// Easy handle with the settings common to all requests. No total timeout is
/// set here; callers that want one add it.
fn new_easy(url: &str, options: &HttpOptions) -> Result<curl::easy::Easy> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.useragent(&options.user_agent)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTS)?;
    easy.connect_timeout(options.connect_timeout)?;
    Ok(easy)
}

/// GET `url` and return the whole body. Fails on non-2xx, on bodies larger
/// than [`MAX_SMALL_BODY`], and when `total_timeout` elapses.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn get_bytes(url: &str, options: &HttpOptions, total_timeout: Duration) -> Result<Vec<u8>> {
    let mut easy = new_easy(url, options)?;
    easy.timeout(total_timeout)?;

    let mut body = Vec::new();
    let mut too_large = false;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_SMALL_BODY {
                too_large = true;
                return Ok(0); // abort transfer
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        let performed = transfer.perform();
        drop(transfer);
        if too_large {
            anyhow::bail!("response from {} exceeds {} bytes", url, MAX_SMALL_BODY);
        }
        performed.with_context(|| format!("GET {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    Ok(body)
}
