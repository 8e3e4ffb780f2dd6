//! Crate-level integration scenarios, exercised through the public
//! `packet_replay` API with in-memory byte vectors and loopback servers
//! (no live network capture, no real capture file).

use std::io::{Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::thread;

use packet_replay::conversation::store::ConversationStore;
use packet_replay::conversation::{Action, ActionType, Protocol};
use packet_replay::http::{ComparisonResult, HttpResponseState};
use packet_replay::layers::{ETHERTYPE_IPV4, IPPROTO_TCP, IPPROTO_UDP};
use packet_replay::layers::LinkType;
use packet_replay::packet::dissect;
use packet_replay::replay::{tcp as replay_tcp, udp as replay_udp};
use packet_replay::script::{self, ScriptConversation};
use packet_replay::validator::{default_validator, ReplayContext};

const FLAG_FIN: u8 = 0x01;
const FLAG_SYN: u8 = 0x02;
const FLAG_ACK: u8 = 0x10;

fn tcp_frame(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
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
    ip[12..16].copy_from_slice(&src);
    ip[16..20].copy_from_slice(&dst);
    ip.extend_from_slice(&tcp);

    let mut eth = vec![0u8; 14];
    eth[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    eth.extend_from_slice(&ip);
    eth
}

fn udp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = (8 + payload.len()) as u16;
    let mut udp = vec![0u8; 8];
    udp[0..2].copy_from_slice(&src_port.to_be_bytes());
    udp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    udp[4..6].copy_from_slice(&length.to_be_bytes());
    udp.extend_from_slice(payload);

    let total_len = (20 + udp.len()) as u16;
    let mut ip = vec![0u8; 20];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip[9] = IPPROTO_UDP;
    ip[12..16].copy_from_slice(&src);
    ip[16..20].copy_from_slice(&dst);
    ip.extend_from_slice(&udp);

    let mut eth = vec![0u8; 14];
    eth[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    eth.extend_from_slice(&ip);
    eth
}

#[test]
fn scenario_1_ipv4_tcp_handshake_produces_connect_send_close() {
    let a = [10, 0, 0, 1];
    let b = [10, 0, 0, 2];
    let mut store = ConversationStore::new();

    for frame in [
        tcp_frame(a, b, 40000, 80, FLAG_SYN, b""),
        tcp_frame(b, a, 80, 40000, FLAG_SYN | FLAG_ACK, b""),
        tcp_frame(a, b, 40000, 80, FLAG_ACK, b""),
        tcp_frame(a, b, 40000, 80, FLAG_ACK, b"hi"),
        tcp_frame(b, a, 80, 40000, FLAG_FIN | FLAG_ACK, b""),
    ] {
        let packet = dissect(LinkType::Ethernet, &frame).unwrap();
        store.ingest(&packet).unwrap();
    }

    assert_eq!(store.len(), 1);
    let (_, conv) = store.conversations().next().unwrap();
    let actions: Vec<ActionType> = conv
        .base()
        .action_queue
        .iter()
        .map(|action| action.action_type)
        .collect();
    assert_eq!(
        actions,
        vec![ActionType::Connect, ActionType::Send, ActionType::Close]
    );
    assert_eq!(conv.base().action_queue[1].payload, b"hi");
}

#[test]
fn scenario_2_target_rewrite_redirects_test_sock_addr() {
    let mut store = ConversationStore::new();
    store
        .rules
        .add("10.0.0.1:1000:127.0.0.1:2000")
        .unwrap();

    let a = [10, 0, 0, 1];
    let b = [10, 0, 0, 2];
    for frame in [
        tcp_frame(a, b, 1000, 80, FLAG_SYN, b""),
        tcp_frame(b, a, 80, 1000, FLAG_SYN | FLAG_ACK, b""),
        tcp_frame(a, b, 1000, 80, FLAG_ACK, b""),
    ] {
        let packet = dissect(LinkType::Ethernet, &frame).unwrap();
        store.ingest(&packet).unwrap();
    }

    let (_, conv) = store.conversations().next().unwrap();
    assert_eq!(conv.base().test_sock_addr.to_string(), "127.0.0.1:2000");
}

#[test]
fn scenario_3_http_content_length_comparison() {
    let captured = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

    let mut expected = HttpResponseState::new();
    expected.process_data(captured).unwrap();
    let mut actual_match = HttpResponseState::new();
    actual_match.process_data(captured).unwrap();
    assert_eq!(expected.compare(&actual_match).unwrap(), ComparisonResult::Match);

    let diverged = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nworld";
    let mut actual_mismatch = HttpResponseState::new();
    actual_mismatch.process_data(diverged).unwrap();
    assert_eq!(
        expected.compare(&actual_mismatch).unwrap(),
        ComparisonResult::BodyMismatch
    );
}

#[test]
fn scenario_4_chunked_response_reassembles_body() {
    let input =
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
    let mut state = HttpResponseState::new();
    state.process_data(input).unwrap();

    assert!(state.is_complete());
    assert_eq!(state.body(), b"hello world");
}

#[test]
fn scenario_5_script_round_trip_preserves_binary_payload() {
    let conv = ScriptConversation {
        protocol: Protocol::Tcp,
        test_addr: "127.0.0.1".parse().unwrap(),
        test_port: 9090,
        actions: vec![Action::send(vec![0x00, 0xff, b'A'])],
    };

    let text = script::write(&conv);
    let rendered = String::from_utf8_lossy(&text);
    assert!(rendered.contains("Encoding: BASE64"));
    assert!(rendered.contains("AP9B"));

    let parsed = script::read(&text).unwrap();
    assert_eq!(parsed.actions.len(), 1);
    assert_eq!(parsed.actions[0].payload, vec![0x00, 0xff, b'A']);
}

#[test]
fn scenario_6_udp_direction_classification_orders_send_before_recv() {
    let a = [10, 0, 0, 1];
    let b = [10, 0, 0, 2];
    let mut store = ConversationStore::new();

    let request = udp_frame(a, b, 5000, 53, b"query");
    let reply = udp_frame(b, a, 53, 5000, b"answer");

    for frame in [request, reply] {
        let packet = dissect(LinkType::Ethernet, &frame).unwrap();
        store.ingest(&packet).unwrap();
    }

    let (_, conv) = store.conversations().next().unwrap();
    let queue = &conv.base().action_queue;
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].action_type, ActionType::Send);
    assert_eq!(queue[0].payload, b"query");
    assert_eq!(queue[1].action_type, ActionType::Recv);
    assert_eq!(queue[1].payload, b"answer");
}

#[test]
fn tcp_replay_against_loopback_server_detects_no_mismatch() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let mut buf = [0u8; 64];
        let n = sock.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"GET / HTTP/1.1\r\n\r\n");
        sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
            .unwrap();
    });

    let mut base = packet_replay::conversation::ConversationBase::for_replay(addr);
    base.action_queue.extend([
        Action::connect(),
        Action::send(b"GET / HTTP/1.1\r\n\r\n".to_vec()),
        Action::recv(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec()),
        Action::close(),
    ]);

    let mismatches = replay_tcp::replay(&mut base).unwrap();
    server.join().unwrap();
    assert!(mismatches.is_empty());
}

#[test]
fn udp_replay_against_loopback_server_detects_mismatch() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (n, peer) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
        server.send_to(b"pong", peer).unwrap();
    });

    let mut base = packet_replay::conversation::ConversationBase::for_replay(addr);
    base.action_queue
        .extend([Action::send(b"ping".to_vec()), Action::recv(b"ping".to_vec())]);

    let context = ReplayContext::new();
    let mismatches = replay_udp::replay(&mut base, default_validator(), &context).unwrap();
    handle.join().unwrap();
    assert_eq!(mismatches.len(), 1);
}
