//! Tests for the Transport Client
//!
//! These tests verify:
//! - Connection lifecycle (connect, reconnect, disconnect)
//! - Address validation before any I/O
//! - Request framing and the liveness probe byte
//! - Exact-length reads: trickling peers, short frames, deadlines
//! - Error mapping (NotConnected, Timeout, Protocol, Connection)
//!
//! Each test scripts its peer with a plain `TcpListener`.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bridgectl::protocol::{encode_response, Opcode, Response, ResponseKind};
use bridgectl::{BridgeError, Client, Config};

// =============================================================================
// Helper Functions
// =============================================================================

fn local_listener() -> (TcpListener, u32) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, u32::from(port))
}

fn client_with_timeout(read_timeout_ms: u64) -> Client {
    let config = Config::builder()
        .read_timeout_ms(read_timeout_ms)
        .connect_timeout_ms(2000)
        .build();
    Client::new(config)
}

/// A port with nothing listening on it
fn dead_port() -> u32 {
    let (listener, port) = local_listener();
    drop(listener);
    port
}

/// Accept one connection, read `expect` request bytes, then run `reply`
fn spawn_peer<F>(listener: TcpListener, expect: usize, reply: F) -> JoinHandle<Vec<u8>>
where
    F: FnOnce(&mut TcpStream) + Send + 'static,
{
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut request = vec![0u8; expect];
        stream.read_exact(&mut request).unwrap();
        reply(&mut stream);
        request
    })
}

fn frame(opcode: u8, value: u32) -> Vec<u8> {
    encode_response(&Response { opcode, kind: ResponseKind::Status, value }).to_vec()
}

/// Wait for the peer to observe EOF on an accepted socket
fn assert_closed_by_client(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut rest = Vec::new();
    match stream.read_to_end(&mut rest) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::ConnectionReset => {}
        Err(e) => panic!("Socket was not closed by the client: {}", e),
    }
}

// =============================================================================
// Disconnected State Tests
// =============================================================================

#[test]
fn test_new_client_is_disconnected() {
    let mut client = Client::default();

    assert!(!client.is_connected());
    assert_eq!(client.ip(), None);
    assert_eq!(client.port(), None);
    assert_eq!(client.config().read_timeout_ms, 10_000);
}

#[test]
fn test_send_command_while_disconnected() {
    let mut client = Client::default();

    match client.send_command(Opcode::GetBootMode, 0) {
        Err(BridgeError::NotConnected) => {}
        other => panic!("Expected NotConnected, got {:?}", other),
    }
    match client.send_command(Opcode::ResetServer, 0) {
        Err(BridgeError::NotConnected) => {}
        other => panic!("Expected NotConnected, got {:?}", other),
    }
}

#[test]
fn test_reconnect_without_known_address() {
    let mut client = Client::default();
    assert!(matches!(client.reconnect(), Err(BridgeError::InvalidAddress(_))));
}

// =============================================================================
// Connect Tests
// =============================================================================

#[test]
fn test_connect_invalid_ip() {
    let mut client = Client::default();

    let result = client.connect("999.999.999.999", 42069);

    assert!(matches!(result, Err(BridgeError::InvalidAddress(_))));
    assert!(!client.is_connected());
    assert_eq!(client.target(), None);
}

#[test]
fn test_connect_port_out_of_range() {
    let mut client = Client::default();

    let result = client.connect("127.0.0.1", 70000);

    assert!(matches!(result, Err(BridgeError::InvalidAddress(_))));
    assert!(!client.is_connected());
}

#[test]
fn test_connect_invalid_input_keeps_existing_connection() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);
    client.connect("127.0.0.1", port).unwrap();
    let (_peer, _) = listener.accept().unwrap();

    // Validation fails before the old socket is touched
    assert!(client.connect("not an ip", port).is_err());
    assert!(client.is_connected());
}

#[test]
fn test_connect_success() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);

    client.connect("127.0.0.1", port).unwrap();
    let (_peer, _) = listener.accept().unwrap();

    assert!(client.is_connected());
    assert_eq!(client.ip(), Some(std::net::Ipv4Addr::LOCALHOST));
    assert_eq!(client.port(), Some(port as u16));
}

#[test]
fn test_connect_refused() {
    let port = dead_port();
    let mut client = client_with_timeout(1000);

    match client.connect("127.0.0.1", port) {
        Err(BridgeError::Connection(_)) => {}
        other => panic!("Expected Connection error, got {:?}", other),
    }
    assert!(!client.is_connected());
    // The target is remembered for a later reconnect
    assert_eq!(client.port(), Some(port as u16));
}

#[test]
fn test_connect_twice_closes_first_socket() {
    let (listener_a, port_a) = local_listener();
    let (listener_b, port_b) = local_listener();
    let mut client = client_with_timeout(1000);

    client.connect("127.0.0.1", port_a).unwrap();
    let (mut peer_a, _) = listener_a.accept().unwrap();

    client.connect("127.0.0.1", port_b).unwrap();
    let (_peer_b, _) = listener_b.accept().unwrap();

    // The FIN on A went out before the SYN to B, so it is already queued
    peer_a.set_nonblocking(true).unwrap();
    let mut buf = [0u8; 1];
    match peer_a.read(&mut buf) {
        Ok(0) => {}
        Err(e) if e.kind() == ErrorKind::ConnectionReset => {}
        other => panic!("First socket still open after second connect: {:?}", other),
    }
    assert!(client.is_connected());
    assert_eq!(client.port(), Some(port_b as u16));
}

#[test]
fn test_failed_connect_closes_previous_socket() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);

    client.connect("127.0.0.1", port).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    assert!(matches!(
        client.connect("127.0.0.1", dead_port()),
        Err(BridgeError::Connection(_))
    ));

    assert_closed_by_client(&mut peer);
    assert!(!client.is_connected());
}

#[test]
fn test_reconnect_to_last_address() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);

    client.connect("127.0.0.1", port).unwrap();
    let (mut first, _) = listener.accept().unwrap();

    client.reconnect().unwrap();
    let (_second, _) = listener.accept().unwrap();

    assert_closed_by_client(&mut first);
    assert!(client.is_connected());
}

#[test]
fn test_disconnect() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);
    client.connect("127.0.0.1", port).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    client.disconnect();

    assert!(!client.is_connected());
    assert_closed_by_client(&mut peer);
}

// =============================================================================
// Liveness Probe Tests
// =============================================================================

#[test]
fn test_probe_writes_single_zero_byte() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);
    client.connect("127.0.0.1", port).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    assert!(client.is_connected());

    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut byte = [0xFFu8; 1];
    peer.read_exact(&mut byte).unwrap();
    assert_eq!(byte, [0x00]);
}

#[test]
fn test_probe_detects_closed_peer() {
    let (listener, port) = local_listener();
    let mut client = client_with_timeout(1000);
    client.connect("127.0.0.1", port).unwrap();
    let (peer, _) = listener.accept().unwrap();
    drop(peer);

    // The first write after the peer closes may still succeed; the reset
    // it provokes makes a later probe fail.
    let detected = (0..20).any(|_| {
        thread::sleep(Duration::from_millis(50));
        !client.is_connected()
    });
    assert!(detected, "probe never noticed the closed peer");

    match client.send_command(Opcode::GetBootMode, 0) {
        Err(BridgeError::NotConnected) => {}
        other => panic!("Expected NotConnected, got {:?}", other),
    }
}

// =============================================================================
// Request/Response Tests
// =============================================================================

#[test]
fn test_send_get_command() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        stream.write_all(&frame(1, 1)).unwrap();
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();
    let response = client.send_command(Opcode::GetBootMode, 0).unwrap().unwrap();

    assert_eq!(response, Response::status(Opcode::GetBootMode, 1));
    // Probe byte, then header + opcode
    assert_eq!(peer.join().unwrap(), vec![0x00, 0x04, 0x20, 0x69, 0x01]);
}

#[test]
fn test_send_set_command_with_argument() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 6, |stream| {
        stream.write_all(&frame(3, 1)).unwrap();
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();
    let response = client.send_command(Opcode::SetXvcRunState, 1).unwrap().unwrap();

    assert_eq!(response.value, 1);
    assert_eq!(peer.join().unwrap(), vec![0x00, 0x04, 0x20, 0x69, 0x03, 0x01]);
}

#[test]
fn test_fire_and_forget_never_reads() {
    for opcode in [Opcode::ReconfigWifi, Opcode::ResetServer] {
        let (listener, port) = local_listener();
        // The peer never answers; a read would block for the full 5s
        let peer = spawn_peer(listener, 5, |_| {});

        let mut client = client_with_timeout(5000);
        client.connect("127.0.0.1", port).unwrap();

        let start = Instant::now();
        let result = client.send_command(opcode, 0).unwrap();

        assert!(result.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(peer.join().unwrap(), vec![0x00, 0x04, 0x20, 0x69, opcode as u8]);
    }
}

#[test]
fn test_request_requires_response() {
    let (listener, port) = local_listener();
    let _peer = spawn_peer(listener, 5, |_| {});

    let mut client = client_with_timeout(1000);
    client.connect("127.0.0.1", port).unwrap();

    match client.request(Opcode::ResetServer, 0) {
        Err(BridgeError::MissingResponse(Opcode::ResetServer)) => {}
        other => panic!("Expected MissingResponse, got {:?}", other),
    }
}

#[test]
fn test_response_trickles_in_one_byte_at_a_time() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        stream.set_nodelay(true).unwrap();
        for byte in frame(9, 1) {
            stream.write_all(&[byte]).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();
    let response = client.send_command(Opcode::GetLoggerState, 0).unwrap().unwrap();

    assert_eq!(response, Response::status(Opcode::GetLoggerState, 1));
    peer.join().unwrap();
}

#[test]
fn test_echo_mismatch_is_still_returned() {
    let (listener, port) = local_listener();
    let _peer = spawn_peer(listener, 5, |stream| {
        stream.write_all(&frame(100, 0x6969_6969)).unwrap();
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();
    let response = client.send_command(Opcode::GetBootMode, 0).unwrap().unwrap();

    assert_eq!(response.opcode(), Some(Opcode::Test));
    assert_eq!(response.value, 0x6969_6969);
}

#[test]
fn test_zero_read_timeout_waits_for_response() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        thread::sleep(Duration::from_millis(200));
        stream.write_all(&frame(1, 0)).unwrap();
    });

    let mut client = client_with_timeout(0);
    assert_eq!(client.config().read_timeout(), None);
    client.connect("127.0.0.1", port).unwrap();

    let start = Instant::now();
    let response = client.send_command(Opcode::GetBootMode, 0).unwrap().unwrap();

    assert_eq!(response, Response::status(Opcode::GetBootMode, 0));
    assert!(start.elapsed() >= Duration::from_millis(150));
    peer.join().unwrap();
}

#[test]
fn test_zero_read_timeout_still_reports_closed_peer() {
    let (listener, port) = local_listener();
    let _peer = spawn_peer(listener, 5, |stream| {
        stream.write_all(&frame(1, 0)[..4]).unwrap();
    });

    let mut client = client_with_timeout(0);
    client.connect("127.0.0.1", port).unwrap();

    match client.send_command(Opcode::GetBootMode, 0) {
        Err(BridgeError::Connection(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected Connection error, got {:?}", other),
    }
}

// =============================================================================
// Failure Mapping Tests
// =============================================================================

#[test]
fn test_silent_peer_times_out() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        // Hold the socket open until the client gives up
        let mut sink = [0u8; 1];
        stream.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
        let _ = stream.read(&mut sink);
    });

    let mut client = client_with_timeout(300);
    client.connect("127.0.0.1", port).unwrap();

    let start = Instant::now();
    let result = client.send_command(Opcode::GetBootMode, 0);
    let elapsed = start.elapsed();

    match result {
        Err(BridgeError::Timeout(timeout)) => assert_eq!(timeout, Duration::from_millis(300)),
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(300), "timed out early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "timed out late: {:?}", elapsed);

    // State is left as-is after a failed exchange
    assert!(client.is_connected());
    drop(client);
    peer.join().unwrap();
}

#[test]
fn test_slow_trickle_cannot_extend_deadline() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        stream.set_nodelay(true).unwrap();
        for byte in frame(1, 1) {
            if stream.write_all(&[byte]).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    });

    let mut client = client_with_timeout(300);
    client.connect("127.0.0.1", port).unwrap();

    let start = Instant::now();
    let result = client.send_command(Opcode::GetBootMode, 0);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(BridgeError::Timeout(_))), "got {:?}", result);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(800), "deadline stretched: {:?}", elapsed);
    drop(client);
    peer.join().unwrap();
}

#[test]
fn test_peer_closes_mid_frame() {
    let (listener, port) = local_listener();
    let peer = spawn_peer(listener, 5, |stream| {
        stream.write_all(&[0x04, 0x20, 0x69, 0x01]).unwrap();
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();
    let result = client.send_command(Opcode::GetBootMode, 0);
    peer.join().unwrap();

    match result {
        Err(BridgeError::Connection(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected Connection error, got {:?}", other),
    }
}

#[test]
fn test_header_mismatch_reports_received_bytes() {
    let (listener, port) = local_listener();
    let _peer = spawn_peer(listener, 5, |stream| {
        stream
            .write_all(&[0x04, 0x20, 0x70, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00])
            .unwrap();
    });

    let mut client = client_with_timeout(2000);
    client.connect("127.0.0.1", port).unwrap();

    match client.send_command(Opcode::GetBootMode, 0) {
        Err(BridgeError::Protocol { header }) => assert_eq!(header, [0x04, 0x20, 0x70]),
        other => panic!("Expected Protocol error, got {:?}", other),
    }
}

#[test]
fn test_unknown_opcode_is_caller_error() {
    assert!(matches!(Opcode::try_from(42), Err(BridgeError::UnknownOpcode(42))));
}
