//! Centralized runtime constants for packet-replay.
//!
//! Tunable buffer sizes and format literals are collected here so they can be
//! found and adjusted in a single place rather than scattered across modules.

/// Scratch-buffer size used by the TCP replay engine when reading a live
/// response.
pub const RECV_BUFFER_SIZE: usize = 8192;

/// Extra bytes over the captured datagram size allocated for a UDP `RECV`
/// buffer, so a slightly larger live response isn't truncated.
pub const UDP_RECV_SLACK: usize = 1500;

/// Maximum number of bytes a chunked-encoding hex size line may accumulate
/// before a missing `\r\n` is treated as malformed input.
pub const CHUNK_SIZE_SCRATCH_MAX: usize = 1024;

/// Default substitution-token delimiters. Overridable by the codec
/// caller.
pub const SUBSTITUTION_OPEN: &str = "${";
pub const SUBSTITUTION_CLOSE: &str = "}";

/// Script format literals.
pub const DATA_START_TAG: &str = "<#DATA_START#>";
pub const DATA_END_TAG: &str = "<#DATA_END#>";
pub const SECTION_SEPARATOR: &str = "##############################";

/// Number of trailing payload bytes inspected to decide binary vs. literal
/// encoding when writing a script.
pub const BASE64_TAIL_SCAN_LEN: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizes_positive() {
        assert!(RECV_BUFFER_SIZE > 0);
        assert!(UDP_RECV_SLACK > 0);
        assert!(CHUNK_SIZE_SCRATCH_MAX > 0);
        assert!(BASE64_TAIL_SCAN_LEN > 0);
    }

    #[test]
    fn test_script_tags_distinct() {
        assert_ne!(DATA_START_TAG, DATA_END_TAG);
        assert_ne!(SUBSTITUTION_OPEN, SUBSTITUTION_CLOSE);
    }
}
