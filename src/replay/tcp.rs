//! TCP replay engine.

use std::io::{Read, Write};
use std::net::TcpStream;

use super::MismatchReport;
use crate::config::RECV_BUFFER_SIZE;
use crate::conversation::{Action, ActionType, ConversationBase};
use crate::error::{Error, Result};
use crate::http::{ComparisonResult, HttpResponseState};

/// Drains `base.action_queue` in FIFO order, replaying it against
/// `base.test_sock_addr`, and returns one `MismatchReport` per `RECV`
/// whose live response differed from the captured one.
///
/// This assumes request/response pairing: the processors used to compare
/// expected vs. actual HTTP responses are reset on every `SEND`, matching
/// the original replay client's documented assumption that a response
/// arrives before the next request starts.
pub fn replay(base: &mut ConversationBase) -> Result<Vec<MismatchReport>> {
    let mut mismatches = Vec::new();
    let mut stream: Option<TcpStream> = None;
    let mut expected = HttpResponseState::new();
    let mut actual = HttpResponseState::new();

    for (index, action) in base.action_queue.drain(..).enumerate() {
        match action.action_type {
            ActionType::Connect => {
                stream = Some(TcpStream::connect(base.test_sock_addr)?);
            }
            ActionType::Send => {
                let stream = stream
                    .as_mut()
                    .ok_or_else(|| Error::Internal("SEND action with no open connection".into()))?;
                stream.write_all(&action.payload)?;
                expected.reset();
                actual.reset();
            }
            ActionType::Recv => {
                replay_recv(&action, stream.as_mut(), &mut expected, &mut actual, index, &mut mismatches)?;
            }
            ActionType::Close => {
                stream = None;
            }
        }
    }

    Ok(mismatches)
}

fn replay_recv(
    action: &Action,
    stream: Option<&mut TcpStream>,
    expected: &mut HttpResponseState,
    actual: &mut HttpResponseState,
    index: usize,
    mismatches: &mut Vec<MismatchReport>,
) -> Result<()> {
    let stream = stream.ok_or_else(|| Error::Internal("RECV action with no open connection".into()))?;

    if !expected.is_complete() {
        expected.process_data(&action.payload)?;
    }

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    while !actual.is_complete() {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            )));
        }
        actual.process_data(&buf[..n])?;
    }

    if expected.is_complete() {
        match expected.compare(actual)? {
            ComparisonResult::Match => {}
            ComparisonResult::StatusMismatch { expected, actual } => {
                mismatches.push(MismatchReport {
                    action_index: index,
                    detail: format!("status code differs: expected {expected}, got {actual}"),
                });
            }
            ComparisonResult::BodyMismatch => {
                mismatches.push(MismatchReport {
                    action_index: index,
                    detail: "response body differs from capture".into(),
                });
            }
        }
    }

    Ok(())
}
