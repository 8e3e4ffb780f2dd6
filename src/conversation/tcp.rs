//! TCP conversation reconstructor: a per-flow state machine that folds
//! captured segments into `{CONNECT, SEND, RECV, CLOSE}` actions.

use super::{Action, ConversationBase};
use crate::packet::TransportPacket;

/// Capture-side TCP state. Initial state is `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    SynSent,
    SynReceived,
    Established,
}

pub struct TcpConversation {
    pub base: ConversationBase,
    pub state: TcpState,
}

impl TcpConversation {
    pub fn new(base: ConversationBase) -> Self {
        Self {
            base,
            state: TcpState::Closed,
        }
    }

    /// Folds one captured packet into the state machine, appending actions
    /// to `base.action_queue` as transitions dictate. Packets that don't
    /// belong to this flow's TCP layer, or that don't match the expected
    /// transition for the current state, are silently ignored
    /// (`UnexpectedTcpTransition` — not an error).
    pub fn ingest(&mut self, packet: &TransportPacket) {
        let Some(network) = packet.network() else {
            return;
        };
        let Some(tcp) = packet.tcp() else {
            return;
        };

        if tcp.has_rst() {
            // This crate's ingest phase never holds a live replay socket
            // (ingest fully precedes replay, see DESIGN.md) — so there is
            // nothing to close here, only the state reset.
            self.state = TcpState::Closed;
            return;
        }

        match self.state {
            TcpState::Closed => self.on_closed(network.src_addr(), tcp.is_syn_only(), tcp.payload()),
            TcpState::SynSent => {
                self.on_syn_sent(network.src_addr(), tcp.has_syn(), tcp.has_ack())
            }
            TcpState::SynReceived => self.on_syn_received(network.src_addr(), tcp.has_ack()),
            TcpState::Established => self.on_established(
                network.src_addr(),
                tcp.src_port(),
                tcp.payload(),
                tcp.has_fin(),
            ),
        }
    }

    fn on_closed(&mut self, src_addr: &[u8], is_syn_only: bool, payload: &[u8]) {
        if self.base.is_from_cap_src(src_addr) && is_syn_only {
            self.state = TcpState::SynSent;
        } else if !payload.is_empty() {
            // unexpected packet carrying data while closed; ignore.
        } else {
            // assume a late close-handshake packet; ignore.
        }
    }

    fn on_syn_sent(&mut self, src_addr: &[u8], has_syn: bool, has_ack: bool) {
        if self.base.is_from_cap_dest(src_addr) && has_syn && has_ack {
            self.state = TcpState::SynReceived;
        }
    }

    fn on_syn_received(&mut self, src_addr: &[u8], has_ack: bool) {
        if self.base.is_from_cap_src(src_addr) && has_ack {
            self.state = TcpState::Established;
            self.base.action_queue.push_back(Action::connect());
        }
    }

    fn on_established(&mut self, src_addr: &[u8], src_port: u16, payload: &[u8], has_fin: bool) {
        if !payload.is_empty() {
            let action = if self.base.is_from_cap_src(src_addr) && src_port == self.base.cap_src_port
            {
                Action::send(payload.to_vec())
            } else {
                Action::recv(payload.to_vec())
            };
            self.base.action_queue.push_back(action);
        }

        if has_fin {
            self.state = TcpState::Closed;
            self.base.action_queue.push_back(Action::close());
        }
    }
}
