//! Replay engines: execute a conversation's action log against its
//! (possibly redirected) target address.

pub mod tcp;
pub mod udp;

/// One detected difference between a captured and a live response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchReport {
    /// Index of the `RECV` action (within the conversation's action log)
    /// whose live response diverged from the capture.
    pub action_index: usize,
    pub detail: String,
}
