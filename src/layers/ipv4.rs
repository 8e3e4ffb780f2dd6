//! IPv4 header parsing.

use super::{AddressFamily, Layer3Ops};
use crate::error::{Error, Result};

const MIN_IPV4_HEADER_LEN: usize = 20;

pub struct Ipv4Layer<'a> {
    bytes: &'a [u8],
}

impl<'a> Ipv4Layer<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self> {
        if frame.len() < MIN_IPV4_HEADER_LEN {
            return Err(Error::MalformedPacket(format!(
                "ipv4 header too short: {} bytes",
                frame.len()
            )));
        }
        let ihl = (frame[0] & 0x0f) as usize * 4;
        if ihl < MIN_IPV4_HEADER_LEN || frame.len() < ihl {
            return Err(Error::MalformedPacket(format!(
                "ipv4 invalid IHL: {ihl} bytes, frame has {} bytes",
                frame.len()
            )));
        }
        let total_len = u16::from_be_bytes([frame[2], frame[3]]) as usize;
        if total_len < ihl || frame.len() < total_len {
            return Err(Error::MalformedPacket(format!(
                "ipv4 total length {total_len} inconsistent with frame of {} bytes",
                frame.len()
            )));
        }
        Ok(Self { bytes: frame })
    }

    fn ihl(&self) -> usize {
        (self.bytes[0] & 0x0f) as usize * 4
    }

    fn total_len(&self) -> usize {
        u16::from_be_bytes([self.bytes[2], self.bytes[3]]) as usize
    }
}

impl<'a> Layer3Ops for Ipv4Layer<'a> {
    fn address_family(&self) -> AddressFamily {
        AddressFamily::Inet
    }

    fn src_addr(&self) -> &[u8] {
        &self.bytes[12..16]
    }

    fn dest_addr(&self) -> &[u8] {
        &self.bytes[16..20]
    }

    fn next_protocol(&self) -> u8 {
        self.bytes[9]
    }

    fn payload(&self) -> &[u8] {
        &self.bytes[self.ihl()..self.total_len()]
    }
}
