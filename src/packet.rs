//! `TransportPacket`: one dissected frame, and the frame-to-packet pipeline
//! that builds it.

use crate::layers::{
    AddressFamily, EthernetLayer, Ipv4Layer, Ipv6Layer, Layer3Ops, Layer4Ops, LayerView, LinkType,
    NullLayer, TcpLayer, UdpLayer, ETHERTYPE_IPV4, ETHERTYPE_IPV6, IPPROTO_TCP, IPPROTO_UDP,
};

/// OSI layer numbers this crate cares about.
const LAYER_DATA_LINK: usize = 2;
const LAYER_NETWORK: usize = 3;
const LAYER_TRANSPORT: usize = 4;
const LAYER_SLOTS: usize = 7;

/// One dissected frame: a sparse, OSI-layer-indexed vector of zero-copy
/// header views, all borrowing from the same underlying frame buffer.
pub struct TransportPacket<'a> {
    layers: [Option<LayerView<'a>>; LAYER_SLOTS],
}

impl<'a> TransportPacket<'a> {
    fn empty() -> Self {
        Self {
            layers: Default::default(),
        }
    }

    fn set(&mut self, osi_layer: usize, view: LayerView<'a>) {
        self.layers[osi_layer - 1] = Some(view);
    }

    pub fn layer(&self, osi_layer: usize) -> Option<&LayerView<'a>> {
        self.layers.get(osi_layer - 1).and_then(|l| l.as_ref())
    }

    pub fn network(&self) -> Option<&dyn Layer3Ops> {
        self.layer(LAYER_NETWORK).and_then(LayerView::as_layer3)
    }

    pub fn transport(&self) -> Option<&dyn Layer4Ops> {
        self.layer(LAYER_TRANSPORT).and_then(LayerView::as_layer4)
    }

    pub fn tcp(&self) -> Option<&TcpLayer<'a>> {
        self.layer(LAYER_TRANSPORT).and_then(LayerView::as_tcp)
    }

    pub fn udp(&self) -> Option<&UdpLayer<'a>> {
        self.layer(LAYER_TRANSPORT).and_then(LayerView::as_udp)
    }

    pub fn address_family(&self) -> Option<AddressFamily> {
        self.network().map(Layer3Ops::address_family)
    }
}

/// Dissects one captured frame into a `TransportPacket`.
///
/// Returns `None` for any unsupported link type, unsupported next-protocol,
/// or malformed header — those are silent drops, not errors.
/// `caplen != len` truncation is checked by the frame iterator before this
/// is ever called, so it never has to be re-checked here.
pub fn dissect<'a>(link_type: LinkType, frame: &'a [u8]) -> Option<TransportPacket<'a>> {
    let mut packet = TransportPacket::empty();

    let l3_payload: &'a [u8] = match link_type {
        LinkType::Ethernet => {
            let eth = match EthernetLayer::parse(frame) {
                Ok(eth) => eth,
                Err(e) => {
                    tracing::debug!("dropping frame: {e}");
                    return None;
                }
            };
            let ether_type = eth.ether_type();
            let payload = eth.payload();
            packet.set(LAYER_DATA_LINK, LayerView::Ethernet(eth));
            match ether_type {
                ETHERTYPE_IPV4 => parse_ipv4(&mut packet, payload)?,
                ETHERTYPE_IPV6 => parse_ipv6(&mut packet, payload)?,
                other => {
                    tracing::debug!("dropping frame: unhandled ethertype 0x{other:04x}");
                    return None;
                }
            }
        }
        LinkType::Null => {
            let null = match NullLayer::parse(frame) {
                Ok(null) => null,
                Err(e) => {
                    tracing::debug!("dropping frame: {e}");
                    return None;
                }
            };
            let payload = null.payload();
            let is_v4 = null.is_ipv4();
            let is_v6 = null.is_ipv6();
            packet.set(LAYER_DATA_LINK, LayerView::Null(null));
            if is_v4 {
                parse_ipv4(&mut packet, payload)?
            } else if is_v6 {
                parse_ipv6(&mut packet, payload)?
            } else {
                tracing::debug!("dropping frame: unhandled null/loopback address family");
                return None;
            }
        }
    };

    let next_protocol = packet.network()?.next_protocol();
    match next_protocol {
        IPPROTO_TCP => match TcpLayer::parse(l3_payload) {
            Ok(tcp) => packet.set(LAYER_TRANSPORT, LayerView::Tcp(tcp)),
            Err(e) => {
                tracing::debug!("dropping packet: {e}");
                return None;
            }
        },
        IPPROTO_UDP => match UdpLayer::parse(l3_payload) {
            Ok(udp) => packet.set(LAYER_TRANSPORT, LayerView::Udp(udp)),
            Err(e) => {
                tracing::debug!("dropping packet: {e}");
                return None;
            }
        },
        other => {
            tracing::debug!("dropping packet: unhandled next-protocol {other}");
            return None;
        }
    }

    Some(packet)
}

fn parse_ipv4<'a>(packet: &mut TransportPacket<'a>, bytes: &'a [u8]) -> Option<&'a [u8]> {
    match Ipv4Layer::parse(bytes) {
        Ok(ip) => {
            let payload = ip.payload();
            packet.set(LAYER_NETWORK, LayerView::Ipv4(ip));
            Some(payload)
        }
        Err(e) => {
            tracing::debug!("dropping frame: {e}");
            None
        }
    }
}

fn parse_ipv6<'a>(packet: &mut TransportPacket<'a>, bytes: &'a [u8]) -> Option<&'a [u8]> {
    match Ipv6Layer::parse(bytes) {
        Ok(ip) => {
            let payload = ip.payload();
            packet.set(LAYER_NETWORK, LayerView::Ipv6(ip));
            Some(payload)
        }
        Err(e) => {
            tracing::debug!("dropping frame: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::ETHERTYPE_IPV4;

    fn build_ipv4_tcp_frame(src_port: u16, dst_port: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
        let mut tcp = vec![0u8; 20];
        tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
        tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
        tcp[12] = 5 << 4;
        tcp[13] = flags;
        tcp.extend_from_slice(payload);

        let total_len = (20 + tcp.len()) as u16;
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&total_len.to_be_bytes());
        ip[9] = IPPROTO_TCP;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 0, 2]);
        ip.extend_from_slice(&tcp);

        let mut eth = vec![0u8; 14];
        eth[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        eth.extend_from_slice(&ip);
        eth
    }

    #[test]
    fn test_dissect_ethernet_ipv4_tcp() {
        let frame = build_ipv4_tcp_frame(40000, 80, 0x02, b"hi");
        let packet = dissect(LinkType::Ethernet, &frame).expect("should dissect");
        let net = packet.network().expect("network layer");
        assert_eq!(net.src_addr_str(), "10.0.0.1");
        let tcp = packet.tcp().expect("tcp layer");
        assert_eq!(tcp.src_port(), 40000);
        assert_eq!(tcp.payload(), b"hi");
    }

    #[test]
    fn test_dissect_unknown_ethertype_drops() {
        let mut frame = vec![0u8; 14 + 20];
        frame[12..14].copy_from_slice(&0x1234u16.to_be_bytes());
        assert!(dissect(LinkType::Ethernet, &frame).is_none());
    }

    #[test]
    fn test_dissect_truncated_ethernet_drops() {
        assert!(dissect(LinkType::Ethernet, &[0u8; 4]).is_none());
    }
}
