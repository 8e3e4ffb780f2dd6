//! Unified error type for the packet-replay library and CLI.
//!
//! `Error` is the single error type returned by every fallible public
//! function. Each variant maps to one failure domain from the error-kind
//! table; `UnexpectedTcpTransition` and `HttpMismatch` deliberately have no
//! variant here — they are not failures, see the module doc in `conversation`
//! and `http` respectively.

/// Library-wide error type. One variant per failure domain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `caplen != len` for a captured frame — the capture is truncated.
    #[error("packet not fully captured: caplen {caplen} != len {len}")]
    TruncatedFrame { caplen: u32, len: u32 },

    /// Unsupported link-layer type or next-protocol number during dissection.
    #[error("unknown link type or protocol: {0}")]
    UnknownLinkOrProto(String),

    /// Header too short, bogus length field, or otherwise malformed packet.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Invalid target-server spec, script header, or CLI argument.
    #[error("invalid configuration: {0}")]
    ConfigParse(String),

    /// Underlying I/O failure (socket connect/read/write/bind, file access).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither `content-length` nor `transfer-encoding: chunked` present.
    #[error("unsupported HTTP encoding: {0}")]
    HttpEncodingUnsupported(String),

    /// Malformed script file (missing header, bad action line, unterminated
    /// data block).
    #[error("script parse error: {0}")]
    ScriptParse(String),

    /// A broken internal invariant, e.g. a duplicate flow-key insertion.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(err: std::net::AddrParseError) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::ScriptParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_frame_display() {
        let err = Error::TruncatedFrame {
            caplen: 10,
            len: 60,
        };
        assert_eq!(
            err.to_string(),
            "packet not fully captured: caplen 10 != len 60"
        );
    }

    #[test]
    fn test_from_io_error_produces_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_from_parse_int_error_produces_config_parse_variant() {
        let parse_err = "abc".parse::<u16>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_from_addr_parse_error_produces_config_parse_variant() {
        let parse_err = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
