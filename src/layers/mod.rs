//! Zero-copy header views over a captured frame.
//!
//! Each dissector borrows from the original frame buffer and exposes its
//! fields through the `Layer3Ops`/`Layer4Ops` capability traits rather than
//! through a base-class hierarchy: a `LayerView` is a tagged union, and
//! "ask any layer-3 view for its address family" is just a match on the
//! trait, not a virtual call.

pub mod ethernet;
pub mod ipv4;
pub mod ipv6;
pub mod null;
pub mod tcp;
pub mod udp;

pub use ethernet::EthernetLayer;
pub use ipv4::Ipv4Layer;
pub use ipv6::Ipv6Layer;
pub use null::NullLayer;
pub use tcp::TcpLayer;
pub use udp::UdpLayer;

/// Link-layer framing convention of the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// BSD loopback / "null" framing (`DLT_NULL`).
    Null,
    /// Ethernet framing (`DLT_EN10MB`).
    Ethernet,
}

/// IP protocol family, needed wherever socket-address plumbing has to know
/// how many bytes an address occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    /// Address size in bytes (4 for IPv4, 16 for IPv6).
    pub fn addr_size(self) -> usize {
        match self {
            AddressFamily::Inet => 4,
            AddressFamily::Inet6 => 16,
        }
    }
}

/// Capability set exposed by every layer-3 (network) view.
pub trait Layer3Ops {
    fn address_family(&self) -> AddressFamily;
    fn src_addr(&self) -> &[u8];
    fn dest_addr(&self) -> &[u8];
    /// IP protocol number of the next (layer-4) header.
    fn next_protocol(&self) -> u8;
    /// Sub-slice of the frame carrying the layer-4 header and payload.
    fn payload(&self) -> &[u8];

    fn src_addr_str(&self) -> String {
        addr_to_string(self.address_family(), self.src_addr())
    }
}

/// Capability set exposed by every layer-4 (transport) view.
pub trait Layer4Ops {
    fn src_port(&self) -> u16;
    fn dest_port(&self) -> u16;
    /// Application-layer payload, past this transport header.
    fn payload(&self) -> &[u8];
}

/// Renders a raw address (4 or 16 bytes) the way `std::net` would print it.
pub fn addr_to_string(family: AddressFamily, bytes: &[u8]) -> String {
    match family {
        AddressFamily::Inet if bytes.len() == 4 => {
            std::net::Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]).to_string()
        }
        AddressFamily::Inet6 if bytes.len() == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            std::net::Ipv6Addr::from(octets).to_string()
        }
        _ => String::new(),
    }
}

/// IP protocol numbers relevant to this crate (`IPPROTO_TCP`/`IPPROTO_UDP`).
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// EtherType values selecting the layer-3 parser.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// A single dissected header, tagged by variant (avoids a dyn-trait
/// polymorphism") — the Rust analogue of the original's
/// `Layer -> Layer3 -> IpLayer | IpV6Layer` inheritance chain. `TransportPacket`
/// stores one of these per OSI layer number rather than a pointer to a base
/// class.
pub enum LayerView<'a> {
    Ethernet(EthernetLayer<'a>),
    Null(NullLayer<'a>),
    Ipv4(Ipv4Layer<'a>),
    Ipv6(Ipv6Layer<'a>),
    Tcp(TcpLayer<'a>),
    Udp(UdpLayer<'a>),
}

impl<'a> LayerView<'a> {
    pub fn as_layer3(&self) -> Option<&dyn Layer3Ops> {
        match self {
            LayerView::Ipv4(l) => Some(l),
            LayerView::Ipv6(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_layer4(&self) -> Option<&dyn Layer4Ops> {
        match self {
            LayerView::Tcp(l) => Some(l),
            LayerView::Udp(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpLayer<'a>> {
        match self {
            LayerView::Tcp(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_udp(&self) -> Option<&UdpLayer<'a>> {
        match self {
            LayerView::Udp(l) => Some(l),
            _ => None,
        }
    }
}
