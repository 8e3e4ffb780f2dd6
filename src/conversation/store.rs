//! Maps flow keys to conversations and drives the create-on-first-packet
//! policy.

use std::collections::HashMap;

use super::tcp::TcpConversation;
use super::udp::UdpConversation;
use super::ConversationBase;
use crate::error::{Error, Result};
use crate::flow_key::FlowKey;
use crate::layers::IPPROTO_TCP;
use crate::packet::TransportPacket;
use crate::target_server::TargetServerRegistry;
use crate::util::bytes_to_ip_addr;

/// A conversation, tagged by the transport protocol it was reconstructed
/// over (a tagged union rather than a base
/// class).
pub enum ConversationKind {
    Tcp(TcpConversation),
    Udp(UdpConversation),
}

impl ConversationKind {
    pub fn ingest(&mut self, packet: &TransportPacket) {
        match self {
            ConversationKind::Tcp(c) => c.ingest(packet),
            ConversationKind::Udp(c) => c.ingest(packet),
        }
    }

    pub fn base(&self) -> &ConversationBase {
        match self {
            ConversationKind::Tcp(c) => &c.base,
            ConversationKind::Udp(c) => &c.base,
        }
    }
}

/// Owns every rewrite rule and every conversation created from the capture.
#[derive(Default)]
pub struct ConversationStore {
    pub rules: TargetServerRegistry,
    conversations: HashMap<FlowKey, ConversationKind>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> impl Iterator<Item = (&FlowKey, &ConversationKind)> {
        self.conversations.iter()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Looks up (or creates, per the rewrite rules) the conversation for
    /// `packet`, then folds the packet into it. Packets that don't resolve
    /// to a conversation (no matching rule, and a conversation already
    /// exists for some other flow) are silently dropped.
    pub fn ingest(&mut self, packet: &TransportPacket) -> Result<()> {
        let Some(network) = packet.network() else {
            return Ok(());
        };
        let Some(transport) = packet.transport() else {
            return Ok(());
        };

        let key = FlowKey::from_layers(network, transport);

        if let Some(conv) = self.conversations.get_mut(&key) {
            conv.ingest(packet);
            return Ok(());
        }

        let src_addr_str = network.src_addr_str();
        let matched_rule = self
            .rules
            .lookup(&src_addr_str, transport.src_port())
            .cloned();

        let should_create = matched_rule.is_some() || (self.rules.is_empty() && self.is_empty());
        if !should_create {
            return Ok(());
        }

        let cap_dest_ip = bytes_to_ip_addr(network.dest_addr())?;

        let base = ConversationBase::new(
            network.src_addr().to_vec(),
            transport.src_port(),
            network.dest_addr().to_vec(),
            transport.dest_port(),
            matched_rule.as_ref().and_then(|r| r.test_addr),
            matched_rule.as_ref().and_then(|r| r.test_port),
            cap_dest_ip,
        );

        let mut conv = if network.next_protocol() == IPPROTO_TCP {
            ConversationKind::Tcp(TcpConversation::new(base))
        } else {
            ConversationKind::Udp(UdpConversation::new(base))
        };
        conv.ingest(packet);

        if self.conversations.insert(key, conv).is_some() {
            return Err(Error::Internal(
                "duplicate flow key insertion into conversation store".into(),
            ));
        }

        Ok(())
    }
}
