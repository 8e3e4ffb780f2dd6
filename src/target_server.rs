//! User-supplied source→target rewrite rules, and the registry that
//! resolves them against a capture's addressing.
//!
//! ```text
//! IPv4:  SRC_ADDR[:SRC_PORT[:TEST_ADDR[:TEST_PORT]]]
//! IPv6:  [SRC_ADDR][:SRC_PORT][:[TEST_ADDR][:TEST_PORT]]
//! ```
//!
//! Fields omitted from the right are absent; an absent `TEST_ADDR`/
//! `TEST_PORT` means "replay to the address/port observed in the capture".
//! An absent `SRC_PORT` means the rule matches any source port for that
//! address.

use std::collections::HashMap;
use std::net::IpAddr;

use crate::error::{Error, Result};

/// A parsed rewrite rule: replay destination overrides for flows matching a
/// given source address (and, optionally, source port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTestServer {
    pub test_addr: Option<IpAddr>,
    pub test_port: Option<u16>,
}

/// Splits `spec` on `:`, except inside a bracketed IPv6 literal, which is
/// kept intact (with its brackets) as a single token.
fn split_respecting_brackets(spec: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0u32;

    for c in spec.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ':' if depth == 0 => {
                tokens.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

fn strip_brackets(token: &str) -> &str {
    token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(token)
}

fn parse_addr(token: &str) -> Result<IpAddr> {
    strip_brackets(token)
        .parse::<IpAddr>()
        .map_err(|e| Error::ConfigParse(format!("invalid IP address '{token}': {e}")))
}

fn parse_port(token: &str) -> Result<u16> {
    token
        .parse::<u16>()
        .map_err(|e| Error::ConfigParse(format!("invalid port number '{token}': {e}")))
}

/// Result of parsing one `--target-server` spec: the key the rule is
/// registered under and the rewrite it describes.
pub struct ParsedRule {
    pub src_addr: IpAddr,
    pub src_port: Option<u16>,
    pub server: TargetTestServer,
}

/// Parses a target-server spec string, populating fields right-to-left the
/// way the original's tokenize-then-switch-fallthrough does: as many
/// trailing fields as are present get filled in, in `src_addr, src_port,
/// test_addr, test_port` order.
pub fn parse_spec(spec: &str) -> Result<ParsedRule> {
    let tokens = split_respecting_brackets(spec);

    if tokens.is_empty() || tokens[0].is_empty() {
        return Err(Error::ConfigParse(format!(
            "invalid conversation specification '{spec}'"
        )));
    }

    let src_addr = parse_addr(&tokens[0])?;
    let mut src_port = None;
    let mut test_addr = None;
    let mut test_port = None;

    if let Some(tok) = tokens.get(1) {
        if !tok.is_empty() {
            src_port = Some(parse_port(tok)?);
        }
    }
    if let Some(tok) = tokens.get(2) {
        if !tok.is_empty() {
            test_addr = Some(parse_addr(tok)?);
        }
    }
    if let Some(tok) = tokens.get(3) {
        if !tok.is_empty() {
            test_port = Some(parse_port(tok)?);
        }
    }

    Ok(ParsedRule {
        src_addr,
        src_port,
        server: TargetTestServer {
            test_addr,
            test_port,
        },
    })
}

fn rule_key(addr: &str, port: Option<u16>) -> String {
    match port {
        Some(p) => format!("{addr}:{p}"),
        None => addr.to_string(),
    }
}

/// Owns every registered rewrite rule, keyed by `addr` or `addr:port`.
#[derive(Default)]
pub struct TargetServerRegistry {
    rules: HashMap<String, TargetTestServer>,
}

impl TargetServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spec: &str) -> Result<()> {
        let parsed = parse_spec(spec)?;
        let key = rule_key(&parsed.src_addr.to_string(), parsed.src_port);
        self.rules.insert(key, parsed.server);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up the most specific rule matching `(src_addr, src_port)`:
    /// an exact `addr:port` rule first, then an address-only rule.
    pub fn lookup(&self, src_addr: &str, src_port: u16) -> Option<&TargetTestServer> {
        self.rules
            .get(&rule_key(src_addr, Some(src_port)))
            .or_else(|| self.rules.get(&rule_key(src_addr, None)))
    }
}
