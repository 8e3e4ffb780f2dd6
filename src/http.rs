//! HTTP response parsing and comparison.

use std::collections::HashMap;

use crate::config::CHUNK_SIZE_SCRATCH_MAX;
use crate::error::{Error, Result};
use crate::util::{to_lower, trim};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const HEADER_LOOKBACK: usize = 3;

/// Result of comparing two complete `HttpResponseState`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonResult {
    Match,
    StatusMismatch { expected: i32, actual: i32 },
    BodyMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkPhase {
    Size,
    Payload,
    TerminatorCr,
    TerminatorLf,
}

/// A response body reassembled either by `Content-Length` or by chunked
/// transfer encoding.
#[derive(Debug, Clone)]
enum BodyReader {
    ContentLength {
        buf: Vec<u8>,
        expected: usize,
    },
    Chunked {
        accum: Vec<u8>,
        phase: ChunkPhase,
        scratch: Vec<u8>,
        chunk_size: u64,
        chunk_read: u64,
        complete: bool,
    },
}

impl BodyReader {
    fn content_length(expected: usize) -> Self {
        BodyReader::ContentLength {
            buf: Vec::with_capacity(expected),
            expected,
        }
    }

    fn chunked() -> Self {
        BodyReader::Chunked {
            accum: Vec::new(),
            phase: ChunkPhase::Size,
            scratch: Vec::new(),
            chunk_size: 0,
            chunk_read: 0,
            complete: false,
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            BodyReader::ContentLength { buf, expected } => buf.len() == *expected,
            BodyReader::Chunked { complete, .. } => *complete,
        }
    }

    fn feed(&mut self, mut data: &[u8]) -> Result<()> {
        match self {
            BodyReader::ContentLength { buf, expected } => {
                let remaining = expected.saturating_sub(buf.len());
                let take = remaining.min(data.len());
                buf.extend_from_slice(&data[..take]);
                Ok(())
            }
            BodyReader::Chunked {
                accum,
                phase,
                scratch,
                chunk_size,
                chunk_read,
                complete,
            } => {
                while !data.is_empty() && !*complete {
                    match phase {
                        ChunkPhase::Size => {
                            let b = data[0];
                            data = &data[1..];
                            scratch.push(b);
                            if scratch.len() >= 2 && scratch[scratch.len() - 2..] == *b"\r\n" {
                                let hex_part = &scratch[..scratch.len() - 2];
                                let hex_str = std::str::from_utf8(hex_part).map_err(|_| {
                                    Error::ScriptParse("invalid chunk size line".into())
                                })?;
                                *chunk_size = u64::from_str_radix(hex_str.trim(), 16)
                                    .map_err(|e| Error::ScriptParse(format!("invalid chunk size '{hex_str}': {e}")))?;
                                *chunk_read = 0;
                                scratch.clear();
                                *phase = if *chunk_size == 0 {
                                    ChunkPhase::TerminatorCr
                                } else {
                                    ChunkPhase::Payload
                                };
                            } else if scratch.len() > CHUNK_SIZE_SCRATCH_MAX {
                                return Err(Error::ScriptParse(
                                    "chunk size line exceeded scratch buffer without terminator"
                                        .into(),
                                ));
                            }
                        }
                        ChunkPhase::Payload => {
                            let remaining_chunk = (*chunk_size - *chunk_read) as usize;
                            let take = remaining_chunk.min(data.len());
                            accum.extend_from_slice(&data[..take]);
                            *chunk_read += take as u64;
                            data = &data[take..];
                            if *chunk_read == *chunk_size {
                                *phase = ChunkPhase::TerminatorCr;
                            }
                        }
                        ChunkPhase::TerminatorCr => {
                            let b = data[0];
                            data = &data[1..];
                            if b != b'\r' {
                                return Err(Error::ScriptParse(
                                    "malformed chunk terminator (expected CR)".into(),
                                ));
                            }
                            *phase = ChunkPhase::TerminatorLf;
                        }
                        ChunkPhase::TerminatorLf => {
                            let b = data[0];
                            data = &data[1..];
                            if b != b'\n' {
                                return Err(Error::ScriptParse(
                                    "malformed chunk terminator (expected LF)".into(),
                                ));
                            }
                            if *chunk_size == 0 {
                                *complete = true;
                            } else {
                                *phase = ChunkPhase::Size;
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Stateful ingestor of one HTTP response byte stream.
#[derive(Debug, Clone)]
pub struct HttpResponseState {
    header_buffer: Vec<u8>,
    headers: HashMap<String, String>,
    status_code: i32,
    header_parsed: bool,
    body: Option<BodyReader>,
}

impl Default for HttpResponseState {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseState {
    pub fn new() -> Self {
        Self {
            header_buffer: Vec::new(),
            headers: HashMap::new(),
            status_code: -1,
            header_parsed: false,
            body: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_complete(&self) -> bool {
        self.header_parsed && self.body.as_ref().is_some_and(BodyReader::is_complete)
    }

    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Feeds more bytes from the wire. Before the header terminator is
    /// found, bytes accumulate in `header_buffer`; the search for
    /// `\r\n\r\n` starts up to 3 bytes before the newly appended chunk, to
    /// tolerate the terminator being split across two calls.
    pub fn process_data(&mut self, data: &[u8]) -> Result<()> {
        if self.header_parsed {
            if let Some(body) = self.body.as_mut() {
                body.feed(data)?;
            }
            return Ok(());
        }

        let orig_len = self.header_buffer.len();
        let search_from = orig_len.saturating_sub(HEADER_LOOKBACK);
        self.header_buffer.extend_from_slice(data);

        if let Some(rel) = find_subslice(&self.header_buffer[search_from..], HEADER_TERMINATOR) {
            let term_pos = search_from + rel;
            let header_block = self.header_buffer[..term_pos].to_vec();
            let body_start = term_pos + HEADER_TERMINATOR.len();
            let trailing = self.header_buffer[body_start..].to_vec();

            self.parse_header(&header_block)?;
            self.header_parsed = true;
            self.header_buffer.clear();

            if !trailing.is_empty() {
                if let Some(body) = self.body.as_mut() {
                    body.feed(&trailing)?;
                }
            }
        }

        Ok(())
    }

    fn parse_header(&mut self, block: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(block);
        let mut lines = text.split("\r\n").flat_map(|l| l.split('\n'));

        let status_line = lines.next().unwrap_or_default();
        self.status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|tok| tok.parse::<i32>().ok())
            .ok_or_else(|| {
                Error::ScriptParse(format!("malformed HTTP status line: '{status_line}'"))
            })?;

        for line in lines {
            if line.is_empty() {
                continue;
            }
            if let Some(idx) = line.find(':') {
                let mut key = line[..idx].to_string();
                let mut value = line[idx + 1..].to_string();
                trim(&mut key);
                to_lower(&mut key);
                trim(&mut value);
                self.headers.insert(key, value);
            }
        }

        if let Some(len) = self.headers.get("content-length") {
            let expected = len
                .parse::<usize>()
                .map_err(|e| Error::HttpEncodingUnsupported(format!("bad content-length: {e}")))?;
            self.body = Some(BodyReader::content_length(expected));
        } else if self
            .headers
            .get("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
        {
            self.body = Some(BodyReader::chunked());
        } else {
            return Err(Error::HttpEncodingUnsupported(
                "unsupported HTTP encoding".into(),
            ));
        }

        Ok(())
    }

    pub fn body(&self) -> &[u8] {
        match &self.body {
            Some(BodyReader::ContentLength { buf, .. }) => buf,
            Some(BodyReader::Chunked { accum, .. }) => accum,
            None => &[],
        }
    }

    /// Compares `self` (expected) against `other` (actual). Both must be
    /// complete. Headers are never compared.
    pub fn compare(&self, other: &Self) -> Result<ComparisonResult> {
        if !self.is_complete() || !other.is_complete() {
            return Err(Error::Internal(
                "HTTP comparison requested before both responses are complete".into(),
            ));
        }

        if self.status_code != other.status_code {
            return Ok(ComparisonResult::StatusMismatch {
                expected: self.status_code,
                actual: other.status_code,
            });
        }

        match (&self.body, &other.body) {
            (Some(BodyReader::ContentLength { .. }), Some(BodyReader::ContentLength { .. }))
            | (Some(BodyReader::Chunked { .. }), Some(BodyReader::Chunked { .. })) => {
                if self.body() == other.body() {
                    Ok(ComparisonResult::Match)
                } else {
                    Ok(ComparisonResult::BodyMismatch)
                }
            }
            _ => Err(Error::HttpEncodingUnsupported(
                "response used different transfer encoding".into(),
            )),
        }
    }
}
