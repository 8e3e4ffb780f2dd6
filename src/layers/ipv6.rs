//! IPv6 fixed-header parsing. Extension headers are not walked (open
//! question, see DESIGN.md): `next_header` is read straight from the fixed
//! header regardless of whether it actually names a transport protocol or
//! an extension header.

use super::{AddressFamily, Layer3Ops};
use crate::error::{Error, Result};

const IPV6_HEADER_LEN: usize = 40;

pub struct Ipv6Layer<'a> {
    bytes: &'a [u8],
}

impl<'a> Ipv6Layer<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self> {
        if frame.len() < IPV6_HEADER_LEN {
            return Err(Error::MalformedPacket(format!(
                "ipv6 header too short: {} bytes",
                frame.len()
            )));
        }
        let payload_len = u16::from_be_bytes([frame[4], frame[5]]) as usize;
        if frame.len() < IPV6_HEADER_LEN + payload_len {
            return Err(Error::MalformedPacket(format!(
                "ipv6 payload length {payload_len} inconsistent with frame of {} bytes",
                frame.len()
            )));
        }
        Ok(Self { bytes: frame })
    }

    fn payload_len(&self) -> usize {
        u16::from_be_bytes([self.bytes[4], self.bytes[5]]) as usize
    }
}

impl<'a> Layer3Ops for Ipv6Layer<'a> {
    fn address_family(&self) -> AddressFamily {
        AddressFamily::Inet6
    }

    fn src_addr(&self) -> &[u8] {
        &self.bytes[8..24]
    }

    fn dest_addr(&self) -> &[u8] {
        &self.bytes[24..40]
    }

    fn next_protocol(&self) -> u8 {
        self.bytes[6]
    }

    fn payload(&self) -> &[u8] {
        &self.bytes[IPV6_HEADER_LEN..IPV6_HEADER_LEN + self.payload_len()]
    }
}
