//! Actions, substitution tokens, and the addressing state shared by every
//! conversation variant.

pub mod store;
pub mod tcp;
pub mod udp;

use std::net::{IpAddr, SocketAddr};

use crate::config::{SUBSTITUTION_CLOSE, SUBSTITUTION_OPEN};

/// Transport protocol a conversation was reconstructed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// One replayable step extracted from the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Connect,
    Send,
    Recv,
    Close,
}

/// A `${name}` region inside an action's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubToken {
    pub text: String,
    pub begin: usize,
    pub end: usize,
}

/// A single entry in a conversation's action log.
#[derive(Debug, Clone)]
pub struct Action {
    pub action_type: ActionType,
    pub payload: Vec<u8>,
    pub sub_tokens: Vec<SubToken>,
}

impl Action {
    pub fn connect() -> Self {
        Self {
            action_type: ActionType::Connect,
            payload: Vec::new(),
            sub_tokens: Vec::new(),
        }
    }

    pub fn close() -> Self {
        Self {
            action_type: ActionType::Close,
            payload: Vec::new(),
            sub_tokens: Vec::new(),
        }
    }

    pub fn send(payload: Vec<u8>) -> Self {
        Self::with_payload(ActionType::Send, payload)
    }

    pub fn recv(payload: Vec<u8>) -> Self {
        Self::with_payload(ActionType::Recv, payload)
    }

    fn with_payload(action_type: ActionType, payload: Vec<u8>) -> Self {
        let sub_tokens = find_sub_tokens(&payload, SUBSTITUTION_OPEN, SUBSTITUTION_CLOSE);
        Self {
            action_type,
            payload,
            sub_tokens,
        }
    }
}

/// Scans `payload` for non-overlapping `open ... close` regions and records
/// each one as a `SubToken` whose `text` is the region between the
/// delimiters (exclusive).
pub fn find_sub_tokens(payload: &[u8], open: &str, close: &str) -> Vec<SubToken> {
    let open = open.as_bytes();
    let close = close.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos + open.len() <= payload.len() {
        if &payload[pos..pos + open.len()] == open {
            let search_from = pos + open.len();
            if let Some(rel) = find_subslice(&payload[search_from..], close) {
                let end = search_from + rel + close.len();
                let text_bytes = &payload[search_from..search_from + rel];
                tokens.push(SubToken {
                    text: String::from_utf8_lossy(text_bytes).into_owned(),
                    begin: pos,
                    end,
                });
                pos = end;
                continue;
            }
        }
        pos += 1;
    }

    tokens
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Addressing state shared by `TcpConversation` and `UdpConversation`:
/// established once from the first packet (plus any matching rewrite
/// rule) and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ConversationBase {
    pub cap_src_addr: Vec<u8>,
    pub cap_src_port: u16,
    pub cap_dest_addr: Vec<u8>,
    pub cap_dest_port: u16,
    pub test_sock_addr: SocketAddr,
    pub action_queue: std::collections::VecDeque<Action>,
}

impl ConversationBase {
    pub fn new(
        cap_src_addr: Vec<u8>,
        cap_src_port: u16,
        cap_dest_addr: Vec<u8>,
        cap_dest_port: u16,
        test_addr: Option<IpAddr>,
        test_port: Option<u16>,
        cap_dest_addr_as_ip: IpAddr,
    ) -> Self {
        let addr = test_addr.unwrap_or(cap_dest_addr_as_ip);
        let port = test_port.unwrap_or(cap_dest_port);
        Self {
            cap_src_addr,
            cap_src_port,
            cap_dest_addr,
            cap_dest_port,
            test_sock_addr: SocketAddr::new(addr, port),
            action_queue: std::collections::VecDeque::new(),
        }
    }

    /// Builds a base for replaying a conversation loaded from a script,
    /// where the only addressing state available is the already-resolved
    /// target socket address (a standalone script carries no capture-side fields).
    pub fn for_replay(test_sock_addr: SocketAddr) -> Self {
        Self {
            cap_src_addr: Vec::new(),
            cap_src_port: 0,
            cap_dest_addr: Vec::new(),
            cap_dest_port: 0,
            test_sock_addr,
            action_queue: std::collections::VecDeque::new(),
        }
    }

    pub fn is_from_cap_src(&self, addr: &[u8]) -> bool {
        addr == self.cap_src_addr.as_slice()
    }

    pub fn is_from_cap_dest(&self, addr: &[u8]) -> bool {
        addr == self.cap_dest_addr.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sub_tokens_single_region() {
        let tokens = find_sub_tokens(b"hello ${name}!", "${", "}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "name");
        assert_eq!(tokens[0].begin, 6);
        assert_eq!(tokens[0].end, 13);
    }

    #[test]
    fn test_find_sub_tokens_multiple_regions() {
        let tokens = find_sub_tokens(b"${a}-${b}", "${", "}");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "b");
    }

    #[test]
    fn test_find_sub_tokens_no_match() {
        assert!(find_sub_tokens(b"plain text", "${", "}").is_empty());
    }

    #[test]
    fn test_find_sub_tokens_unterminated_open_ignored() {
        assert!(find_sub_tokens(b"prefix ${unterminated", "${", "}").is_empty());
    }

    #[test]
    fn test_action_send_collects_sub_tokens() {
        let action = Action::send(b"id=${id}".to_vec());
        assert_eq!(action.action_type, ActionType::Send);
        assert_eq!(action.sub_tokens.len(), 1);
        assert_eq!(action.sub_tokens[0].text, "id");
    }

    #[test]
    fn test_connect_and_close_have_empty_payload() {
        assert!(Action::connect().payload.is_empty());
        assert!(Action::close().payload.is_empty());
    }
}
