//! BSD loopback / "null" link-layer framing (`DLT_NULL`).
//!
//! The header is a 4-byte address-family value in the host's native byte
//! order, followed directly by the layer-3 payload.

use crate::error::{Error, Result};

const NULL_HEADER_LEN: usize = 4;

const BSD_AF_INET: u32 = 2;
const BSD_AF_INET6_VARIANTS: &[u32] = &[24, 28, 30];

pub struct NullLayer<'a> {
    bytes: &'a [u8],
}

impl<'a> NullLayer<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self> {
        if frame.len() < NULL_HEADER_LEN {
            return Err(Error::MalformedPacket(format!(
                "null/loopback frame too short: {} bytes",
                frame.len()
            )));
        }
        Ok(Self { bytes: frame })
    }

    /// Address family, read as a native-endian `u32` the way the BSD
    /// loopback header stores it. Returns `None` when it names neither
    /// IPv4 nor IPv6 so the caller can drop the frame.
    pub fn is_ipv4(&self) -> bool {
        self.address_family() == BSD_AF_INET
    }

    pub fn is_ipv6(&self) -> bool {
        BSD_AF_INET6_VARIANTS.contains(&self.address_family())
    }

    fn address_family(&self) -> u32 {
        u32::from_ne_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[NULL_HEADER_LEN..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_frame(family: u32, payload: &[u8]) -> Vec<u8> {
        let mut frame = family.to_ne_bytes().to_vec();
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_parse_too_short_is_malformed() {
        assert!(NullLayer::parse(&[0u8; 2]).is_err());
    }

    #[test]
    fn test_ipv4_family_detected() {
        let frame = build_frame(BSD_AF_INET, b"x");
        let null = NullLayer::parse(&frame).unwrap();
        assert!(null.is_ipv4());
        assert!(!null.is_ipv6());
        assert_eq!(null.payload(), b"x");
    }

    #[test]
    fn test_ipv6_family_detected() {
        let frame = build_frame(BSD_AF_INET6_VARIANTS[0], b"y");
        let null = NullLayer::parse(&frame).unwrap();
        assert!(null.is_ipv6());
        assert!(!null.is_ipv4());
    }
}
