//! Canonical, direction-insensitive flow identifier.

use crate::layers::{Layer3Ops, Layer4Ops};
use crate::util::bytes_to_hex;

/// A direction-insensitive 5-tuple key: two packets traveling in opposite
/// directions of the same flow produce the identical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey(String);

impl FlowKey {
    /// Builds the key from one packet's network + transport layers.
    pub fn from_layers(network: &dyn Layer3Ops, transport: &dyn Layer4Ops) -> Self {
        Self::build(
            network.src_addr(),
            transport.src_port(),
            network.dest_addr(),
            transport.dest_port(),
        )
    }

    /// Orders `(addr1, port1)` against `(addr2, port2)` by address bytes
    /// first, then by port, and joins the lower pair before the higher pair
    /// as `lo_addr_hex:lo_port:hi_addr_hex:hi_port`.
    pub fn build(addr1: &[u8], port1: u16, addr2: &[u8], port2: u16) -> Self {
        let (lo_addr, lo_port, hi_addr, hi_port) = match addr1.cmp(addr2) {
            std::cmp::Ordering::Less => (addr1, port1, addr2, port2),
            std::cmp::Ordering::Greater => (addr2, port2, addr1, port1),
            std::cmp::Ordering::Equal => {
                if port1 <= port2 {
                    (addr1, port1, addr2, port2)
                } else {
                    (addr2, port2, addr1, port1)
                }
            }
        };

        Self(format!(
            "{}:{}:{}:{}",
            bytes_to_hex(lo_addr),
            lo_port,
            bytes_to_hex(hi_addr),
            hi_port
        ))
    }
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_flow_opposite_directions_produce_identical_key() {
        let forward = FlowKey::build(&[10, 0, 0, 1], 40000, &[10, 0, 0, 2], 80);
        let reverse = FlowKey::build(&[10, 0, 0, 2], 80, &[10, 0, 0, 1], 40000);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_different_flows_produce_different_keys() {
        let a = FlowKey::build(&[10, 0, 0, 1], 40000, &[10, 0, 0, 2], 80);
        let b = FlowKey::build(&[10, 0, 0, 1], 40001, &[10, 0, 0, 2], 80);
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_address_orders_by_port() {
        let a = FlowKey::build(&[127, 0, 0, 1], 1000, &[127, 0, 0, 1], 2000);
        let b = FlowKey::build(&[127, 0, 0, 1], 2000, &[127, 0, 0, 1], 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_contains_hex_addresses() {
        let key = FlowKey::build(&[10, 0, 0, 1], 1, &[10, 0, 0, 2], 2);
        assert_eq!(key.to_string(), "0a000001:1:0a000002:2");
    }
}
