// Incremental HTTP/1.x request framing.
//
// `RequestFramer` is a sans-IO state machine: bytes are pushed in as they
// arrive and it reports when a complete request (header block plus a body
// of the declared Content-Length) has been assembled. `read_request` drives
// it from any async byte stream.

use super::models::{Headers, IncomingRequest};
use crate::error::FrameError;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const READ_CHUNK_SIZE: usize = 8192;
pub const MAX_HEADER_BYTES: usize = 64 * 1024;
pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024; // 100MB

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    ReadingHeaders,
    // `header_end` is the offset of the terminator in the buffer.
    ReadingBody {
        header_end: usize,
        content_length: usize,
    },
    Complete {
        header_end: usize,
        body_len: usize,
    },
}

#[derive(Debug, Default)]
struct RequestHead {
    method: String,
    path: String,
    headers: Headers,
}

#[derive(Debug)]
pub struct RequestFramer {
    buffer: Vec<u8>,
    state: FramerState,
    head: RequestHead,
    // Where the next terminator search starts.
    scan_from: usize,
}

impl Default for RequestFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFramer {
    pub fn new() -> Self {
        RequestFramer {
            buffer: Vec::new(),
            state: FramerState::ReadingHeaders,
            head: RequestHead::default(),
            scan_from: 0,
        }
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, FramerState::Complete { .. })
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `chunk` and advances the state machine.
    /// Bytes pushed after completion are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Result<FramerState, FrameError> {
        if self.is_complete() {
            return Ok(self.state);
        }
        self.buffer.extend_from_slice(chunk);

        if self.state == FramerState::ReadingHeaders {
            self.scan_headers()?;
        }

        if let FramerState::ReadingBody {
            header_end,
            content_length,
        } = self.state
        {
            if body_received(self.buffer.len(), header_end) >= content_length {
                self.state = FramerState::Complete {
                    header_end,
                    body_len: content_length,
                };
            }
        }

        Ok(self.state)
    }

    fn scan_headers(&mut self) -> Result<(), FrameError> {
        let Some(offset) = find_subsequence(&self.buffer[self.scan_from..], HEADER_TERMINATOR)
        else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(FrameError::HeadersTooLarge {
                    limit: MAX_HEADER_BYTES,
                });
            }
            // The terminator may straddle the next chunk boundary.
            self.scan_from = self
                .buffer
                .len()
                .saturating_sub(HEADER_TERMINATOR.len() - 1);
            return Ok(());
        };

        let header_end = self.scan_from + offset;
        if header_end > MAX_HEADER_BYTES {
            return Err(FrameError::HeadersTooLarge {
                limit: MAX_HEADER_BYTES,
            });
        }

        self.head = parse_head(&self.buffer[..header_end]);
        let received = body_received(self.buffer.len(), header_end);

        self.state = match content_length(&self.head.headers)? {
            Some(declared) if declared > MAX_BODY_BYTES => {
                return Err(FrameError::BodyTooLarge {
                    declared,
                    limit: MAX_BODY_BYTES,
                });
            }
            Some(declared) => FramerState::ReadingBody {
                header_end,
                content_length: declared,
            },
            // Without a Content-Length the body is whatever already arrived.
            None => FramerState::Complete {
                header_end,
                body_len: received,
            },
        };
        Ok(())
    }

    /// Consumes the framer once the stream has ended or the request is complete.
    pub fn into_request(self) -> Result<IncomingRequest, FrameError> {
        match self.state {
            FramerState::Complete {
                header_end,
                body_len,
            } => {
                let body_start = header_end + HEADER_TERMINATOR.len();
                let mut buffer = self.buffer;
                buffer.truncate(body_start + body_len);
                let body = buffer.split_off(body_start);
                Ok(IncomingRequest {
                    method: self.head.method,
                    path: self.head.path,
                    headers: self.head.headers,
                    body,
                })
            }
            FramerState::ReadingHeaders if self.buffer.is_empty() => Err(FrameError::Empty),
            FramerState::ReadingHeaders => Err(FrameError::IncompleteHeaders {
                received: self.buffer.len(),
            }),
            FramerState::ReadingBody {
                header_end,
                content_length,
            } => Err(FrameError::TruncatedBody {
                expected: content_length,
                received: body_received(self.buffer.len(), header_end),
            }),
        }
    }
}

/// Reads one request from `reader`, stopping as soon as it is complete.
pub async fn read_request<R>(reader: &mut R) -> Result<IncomingRequest, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut framer = RequestFramer::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    while !framer.is_complete() {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            tracing::trace!("Peer closed the stream after {} bytes", framer.buffered());
            break;
        }
        framer.push(&chunk[..n])?;
    }

    framer.into_request()
}

fn body_received(buffered: usize, header_end: usize) -> usize {
    buffered.saturating_sub(header_end + HEADER_TERMINATOR.len())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_head(raw: &[u8]) -> RequestHead {
    let text = String::from_utf8_lossy(raw);
    let mut lines = text.split("\r\n");

    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut headers = Headers::new();
    for line in lines {
        // Lines without a colon are not header fields; skip them.
        if let Some((name, value)) = line.split_once(':') {
            headers.push(name.trim(), value.trim());
        }
    }

    RequestHead {
        method,
        path,
        headers,
    }
}

// Repeated Content-Length fields are accepted only when they agree.
fn content_length(headers: &Headers) -> Result<Option<usize>, FrameError> {
    let mut declared = None;
    for value in headers.get_all("Content-Length") {
        let parsed = parse_content_length(value)?;
        match declared {
            Some(previous) if previous != parsed => {
                return Err(FrameError::MalformedContentLength(value.to_string()));
            }
            _ => declared = Some(parsed),
        }
    }
    Ok(declared)
}

fn parse_content_length(value: &str) -> Result<usize, FrameError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::MalformedContentLength(value.to_string()));
    }
    // All digits, so the only remaining failure is overflow.
    value
        .parse::<usize>()
        .map_err(|_| FrameError::MalformedContentLength(value.to_string()))
}
