//! UDP replay engine.

use std::net::UdpSocket;

use super::MismatchReport;
use crate::config::UDP_RECV_SLACK;
use crate::conversation::{Action, ActionType, ConversationBase};
use crate::error::{Error, Result};
use crate::validator::{PacketValidator, ReplayContext};

/// Drains `base.action_queue`, sending each `SEND` as a single datagram to
/// `base.test_sock_addr` and reading one reply datagram per `RECV`, judged
/// by `validator` against the captured payload.
pub fn replay(
    base: &mut ConversationBase,
    validator: &dyn PacketValidator,
    context: &ReplayContext,
) -> Result<Vec<MismatchReport>> {
    let mut mismatches = Vec::new();
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(base.test_sock_addr)?;

    for (index, action) in base.action_queue.drain(..).enumerate() {
        match action.action_type {
            ActionType::Send => {
                socket.send(&action.payload)?;
            }
            ActionType::Recv => {
                recv_and_validate(&socket, &action, validator, context, index, &mut mismatches)?;
            }
            ActionType::Connect | ActionType::Close => {
                // UDP conversations never emit these.
            }
        }
    }

    Ok(mismatches)
}

fn recv_and_validate(
    socket: &UdpSocket,
    action: &Action,
    validator: &dyn PacketValidator,
    context: &ReplayContext,
    index: usize,
    mismatches: &mut Vec<MismatchReport>,
) -> Result<()> {
    let mut buf = vec![0u8; action.payload.len() + UDP_RECV_SLACK];
    let n = socket.recv(&mut buf).map_err(Error::Io)?;
    let actual = &buf[..n];

    if !validator.validate(&action.payload, &action.sub_tokens, actual, context) {
        mismatches.push(MismatchReport {
            action_index: index,
            detail: "datagram did not validate against the captured payload".into(),
        });
    }

    Ok(())
}
