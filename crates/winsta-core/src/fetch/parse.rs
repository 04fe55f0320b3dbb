//! Response head parsing for raw header lines delivered by libcurl.
//!
//! With redirects followed, curl reports one header block per hop. A block
//! ends at the empty line; interim blocks (1xx, and 3xx carrying a Location
//! that curl will follow) are skipped so only the final response counts.

/// Status and size of the final response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    pub content_length: Option<u64>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Accumulates header lines of the block currently being received.
#[derive(Debug, Default)]
pub(crate) struct HeaderBlock {
    status: Option<u32>,
    has_location: bool,
    content_length: Option<u64>,
}

impl HeaderBlock {
    /// Feed one header line; returns the head when the final block ends.
    pub(crate) fn feed(&mut self, raw: &str) -> Option<ResponseHead> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if let Some(code) = parse_status_line(line) {
            *self = HeaderBlock {
                status: Some(code),
                ..HeaderBlock::default()
            };
            return None;
        }
        if line.is_empty() {
            let status = self.status?;
            let interim =
                (100..200).contains(&status) || ((300..400).contains(&status) && self.has_location);
            let head = ResponseHead {
                status,
                content_length: self.content_length,
            };
            *self = HeaderBlock::default();
            return if interim { None } else { Some(head) };
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("location") && !value.is_empty() {
                self.has_location = true;
            }
        }
        None
    }
}

/// `HTTP/1.1 200 OK` → 200. Also accepts `HTTP/2 404`.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.split_whitespace();
    let _version = parts.next()?;
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}
