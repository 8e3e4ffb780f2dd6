//! Conversation script codec: a text-based serialization of one
//! conversation's action log.
//!
//! This crate's scripts are read and written as complete in-memory byte
//! buffers (one file = one conversation, never streamed from a live
//! socket), so the binary-safe `<#DATA_END#>` tag search can simply scan
//! the already-loaded buffer rather than track state across fixed-size
//! reads the way a socket-backed reader would have to.

use std::io::Write as _;
use std::net::IpAddr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::config::{BASE64_TAIL_SCAN_LEN, DATA_END_TAG, DATA_START_TAG, SECTION_SEPARATOR};
use crate::conversation::{Action, ActionType, Protocol};
use crate::error::{Error, Result};

/// A conversation in the shape the script codec reads and writes: just the
/// fields that appear in the text format, decoupled from the live
/// `ConversationKind`/`ConversationBase` used during capture ingest.
pub struct ScriptConversation {
    pub protocol: Protocol,
    pub test_addr: IpAddr,
    pub test_port: u16,
    pub actions: Vec<Action>,
}

fn protocol_str(p: Protocol) -> &'static str {
    match p {
        Protocol::Tcp => "TCP",
        Protocol::Udp => "UDP",
    }
}

fn parse_protocol(s: &str) -> Result<Protocol> {
    match s.to_ascii_uppercase().as_str() {
        "TCP" => Ok(Protocol::Tcp),
        "UDP" => Ok(Protocol::Udp),
        other => Err(Error::ScriptParse(format!("unknown protocol '{other}'"))),
    }
}

fn action_type_str(t: ActionType) -> &'static str {
    match t {
        ActionType::Connect => "CONNECT",
        ActionType::Send => "SEND",
        ActionType::Recv => "RECV",
        ActionType::Close => "CLOSE",
    }
}

fn parse_action_type(s: &str) -> Result<ActionType> {
    match s {
        "CONNECT" => Ok(ActionType::Connect),
        "SEND" => Ok(ActionType::Send),
        "RECV" => Ok(ActionType::Recv),
        "CLOSE" => Ok(ActionType::Close),
        other => Err(Error::ScriptParse(format!("unknown action type '{other}'"))),
    }
}

/// Writing policy: if any byte in the last `BASE64_TAIL_SCAN_LEN` bytes of
/// the payload is non-printable and non-whitespace, Base64-encode the
/// whole payload; otherwise write it literally.
fn needs_base64(payload: &[u8]) -> bool {
    let start = payload.len().saturating_sub(BASE64_TAIL_SCAN_LEN);
    payload[start..]
        .iter()
        .any(|&b| !(b.is_ascii_graphic() || b.is_ascii_whitespace()))
}

/// Serializes `conv` into the conversation script text format.
pub fn write(conv: &ScriptConversation) -> Vec<u8> {
    let mut out = Vec::new();
    let _ = writeln!(out, "Protocol: {}", protocol_str(conv.protocol));
    let _ = writeln!(out, "TestAddress: {}", conv.test_addr);
    let _ = writeln!(out, "TestPort: {}", conv.test_port);
    let _ = writeln!(out);

    for action in &conv.actions {
        let _ = writeln!(out, "{SECTION_SEPARATOR}");
        let _ = writeln!(out, "{}", action_type_str(action.action_type));

        if action.payload.is_empty() {
            continue;
        }

        let base64 = needs_base64(&action.payload);
        if base64 {
            let _ = writeln!(out, "Encoding: BASE64");
        }
        let _ = writeln!(out, "{DATA_START_TAG}");
        if base64 {
            let _ = writeln!(out, "{}", BASE64.encode(&action.payload));
        } else {
            out.extend_from_slice(&action.payload);
            out.push(b'\n');
        }
        let _ = writeln!(out, "{DATA_END_TAG}");
    }

    out
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let start = self.pos;
        match self.buf[start..].iter().position(|&b| b == b'\n') {
            Some(rel) => {
                let end = start + rel;
                self.pos = end + 1;
                let mut line = &self.buf[start..end];
                if line.last() == Some(&b'\r') {
                    line = &line[..line.len() - 1];
                }
                Some(line)
            }
            None => {
                self.pos = self.buf.len();
                Some(&self.buf[start..])
            }
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }
}

fn is_comment(line: &[u8]) -> bool {
    line.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'#')
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn strip_ascii_whitespace(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect()
}

/// Parses a conversation script. Lines whose first non-whitespace
/// character is `#` are comments and are skipped wherever they appear.
pub fn read(text: &[u8]) -> Result<ScriptConversation> {
    let mut cursor = Cursor::new(text);
    let mut headers: std::collections::HashMap<String, String> = std::collections::HashMap::new();

    loop {
        let line = cursor
            .next_line()
            .ok_or_else(|| Error::ScriptParse("unexpected end of script while reading header".into()))?;
        if line.is_empty() {
            break;
        }
        if is_comment(line) {
            continue;
        }
        let text_line = String::from_utf8_lossy(line);
        let idx = text_line
            .find(':')
            .ok_or_else(|| Error::ScriptParse(format!("malformed header line '{text_line}'")))?;
        let key = text_line[..idx].trim().to_string();
        let value = text_line[idx + 1..].trim().to_string();
        headers.insert(key, value);
    }

    let protocol = parse_protocol(
        headers
            .get("Protocol")
            .ok_or_else(|| Error::ScriptParse("missing 'Protocol' header".into()))?,
    )?;
    let test_addr_str = headers
        .get("TestAddress")
        .ok_or_else(|| Error::ScriptParse("missing 'TestAddress' header".into()))?;
    let test_addr: IpAddr = test_addr_str
        .parse()
        .map_err(|e| Error::ScriptParse(format!("invalid TestAddress '{test_addr_str}': {e}")))?;
    let test_port_str = headers
        .get("TestPort")
        .ok_or_else(|| Error::ScriptParse("missing 'TestPort' header".into()))?;
    let test_port: u16 = test_port_str
        .parse()
        .map_err(|e| Error::ScriptParse(format!("invalid TestPort '{test_port_str}': {e}")))?;

    let mut actions = Vec::new();

    loop {
        let save_pos = cursor.pos;
        let Some(line) = cursor.next_line() else {
            break;
        };
        if line.is_empty() || is_comment(line) || line == SECTION_SEPARATOR.as_bytes() {
            continue;
        }
        let action_type = parse_action_type(&String::from_utf8_lossy(line))?;
        let _ = save_pos;

        let mut encoding_base64 = false;
        let mut payload = Vec::new();

        loop {
            let before_line = cursor.pos;
            let Some(line) = cursor.next_line() else {
                break;
            };

            if line == DATA_START_TAG.as_bytes() {
                let remaining = cursor.remaining();
                let rel = find_subslice(remaining, DATA_END_TAG.as_bytes()).ok_or_else(|| {
                    Error::ScriptParse("unterminated <#DATA_START#> block".into())
                })?;
                let mut raw = remaining[..rel].to_vec();
                if raw.last() == Some(&b'\n') {
                    raw.pop();
                    if raw.last() == Some(&b'\r') {
                        raw.pop();
                    }
                }
                cursor.advance(rel + DATA_END_TAG.len());
                if cursor.remaining().first() == Some(&b'\r') {
                    cursor.advance(1);
                }
                if cursor.remaining().first() == Some(&b'\n') {
                    cursor.advance(1);
                }
                payload = if encoding_base64 {
                    BASE64.decode(strip_ascii_whitespace(&raw))?
                } else {
                    raw
                };
                break;
            }

            if line.is_empty() || is_comment(line) {
                continue;
            }

            if let Some(idx) = line.iter().position(|&b| b == b':') {
                let key = String::from_utf8_lossy(&line[..idx]).trim().to_ascii_lowercase();
                let value = String::from_utf8_lossy(&line[idx + 1..]).trim().to_string();
                if key == "encoding" {
                    encoding_base64 = value.eq_ignore_ascii_case("base64");
                    continue;
                }
            }

            // Not a recognized metadata line and not the data tag: this
            // line belongs to the next action (no data block here).
            cursor.pos = before_line;
            break;
        }

        actions.push(build_action(action_type, payload));
    }

    Ok(ScriptConversation {
        protocol,
        test_addr,
        test_port,
        actions,
    })
}

fn build_action(action_type: ActionType, payload: Vec<u8>) -> Action {
    match action_type {
        ActionType::Connect => Action::connect(),
        ActionType::Close => Action::close(),
        ActionType::Send => Action::send(payload),
        ActionType::Recv => Action::recv(payload),
    }
}
