//! Pluggable packet validator.
//!
//! The embedded scripting bridge that lets a user supply
//! `python:<file>.py:<func>` as an external validator is out of scope for
//! this crate — `PacketValidator` is the trait-object boundary a host
//! application would hang that bridge off of. This crate ships only the
//! built-in byte-exact, substitution-token-aware default.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::conversation::SubToken;

/// Replay-time context carrying bound values for named substitution tokens
/// e.g. a value captured from an earlier response and threaded into
/// a later request.
#[derive(Debug, Clone, Default)]
pub struct ReplayContext {
    bindings: HashMap<String, Vec<u8>>,
}

impl ReplayContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.bindings.get(name).map(Vec::as_slice)
    }
}

/// Compares a captured ("expected") payload against a live ("actual") one.
pub trait PacketValidator: Send + Sync {
    fn validate(
        &self,
        expected: &[u8],
        expected_tokens: &[SubToken],
        actual: &[u8],
        context: &ReplayContext,
    ) -> bool;
}

/// Byte-exact comparison outside of `${name}` regions; inside a region,
/// honors a bound replacement value from `ReplayContext` if one exists,
/// otherwise falls back to verbatim comparison of the captured token bytes.
pub struct DefaultValidator;

impl PacketValidator for DefaultValidator {
    fn validate(
        &self,
        expected: &[u8],
        expected_tokens: &[SubToken],
        actual: &[u8],
        context: &ReplayContext,
    ) -> bool {
        let mut expected_pos = 0;
        let mut actual_pos = 0;

        for token in expected_tokens {
            let literal_expected = &expected[expected_pos..token.begin];
            let literal_len = literal_expected.len();
            if actual.len() < actual_pos + literal_len {
                return false;
            }
            if &actual[actual_pos..actual_pos + literal_len] != literal_expected {
                return false;
            }
            actual_pos += literal_len;

            let token_name = &token.text;
            let captured_token_bytes = &expected[token.begin..token.end];
            match context.get(token_name) {
                Some(bound) => {
                    if actual.len() < actual_pos + bound.len() {
                        return false;
                    }
                    if &actual[actual_pos..actual_pos + bound.len()] != bound {
                        return false;
                    }
                    actual_pos += bound.len();
                }
                None => {
                    let captured_len = captured_token_bytes.len();
                    if actual.len() < actual_pos + captured_len {
                        return false;
                    }
                    if &actual[actual_pos..actual_pos + captured_len] != captured_token_bytes {
                        return false;
                    }
                    actual_pos += captured_len;
                }
            }

            expected_pos = token.end;
        }

        let trailing_expected = &expected[expected_pos..];
        let trailing_actual = actual.get(actual_pos..).unwrap_or(&[]);
        trailing_expected == trailing_actual
    }
}

static DEFAULT_VALIDATOR: OnceLock<DefaultValidator> = OnceLock::new();

/// Process-wide default validator, lazily initialized on first use
/// (process-wide singleton).
pub fn default_validator() -> &'static DefaultValidator {
    DEFAULT_VALIDATOR.get_or_init(|| DefaultValidator)
}
