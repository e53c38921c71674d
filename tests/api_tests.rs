//! End-to-end tests through the public API and a live HTTP listener

use base64::Engine as _;
use framecount::config::Config;
use framecount::mp3::{count_frames, scan_frames, StopReason};
use framecount::serve::{HttpService, Router};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

/// MPEG1 Layer3, 128kbps, 44100Hz, no padding, zero-filled to 417 bytes
fn full_frame() -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
    frame.resize(417, 0);
    frame
}

// ==========================================================================
// SCANNER SCENARIOS
// ==========================================================================

#[test]
fn single_frame() {
    assert_eq!(count_frames(&full_frame()), 1);
}

#[test]
fn three_frames() {
    assert_eq!(count_frames(&full_frame().repeat(3)), 3);
}

#[test]
fn garbage_between_two_frames() {
    let mut data = full_frame();
    data.extend([0x00, 0x01, 0x02]);
    data.extend(full_frame());
    assert_eq!(count_frames(&data), 2);
}

#[test]
fn reserved_bitrate_stops_for_good() {
    let mut data = full_frame();
    data.extend([0xFF, 0xFB, 0x00, 0x00]);
    data.extend(full_frame());
    assert_eq!(count_frames(&data), 1);

    let stats = scan_frames(&data);
    assert_eq!(stats.frame_count, 1);
    assert!(matches!(stats.stop, StopReason::ReservedHeader { offset: 417, .. }));
}

// ==========================================================================
// LIVE SERVER
// ==========================================================================

fn start_server() -> SocketAddr {
    let mut config = Config::default();
    config.server.bind = "127.0.0.1:0".to_string();
    config.server.workers = 2;

    let service = HttpService::bind(config).expect("bind ephemeral port");
    let addr = service.local_addr().expect("ip listener");
    thread::spawn(move || service.run());
    addr
}

/// Send a raw HTTP/1.1 request and return (status, headers, body)
fn send(addr: SocketAddr, head: &str, body: &[u8]) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("timeout");

    let request = format!(
        "{}\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
        head,
        body.len()
    );
    stream.write_all(request.as_bytes()).expect("write head");
    stream.write_all(body).expect("write body");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).expect("read response");
    let text = String::from_utf8_lossy(&raw).to_string();

    let (headers, body) = text.split_once("\r\n\r\n").unwrap_or((&text, ""));
    let status = headers
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (status, headers.to_string(), body.to_string())
}

#[test]
fn server_round_trip() {
    let addr = start_server();

    let data = full_frame().repeat(4);
    let (status, headers, body) = send(addr, "POST /analyse HTTP/1.1", &data);
    assert_eq!(status, 200);
    assert_eq!(body, r#"{"frameCount":4}"#);
    assert!(headers.contains("X-Frame-Options: Deny"));

    let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
    let (status, _, body) = send(
        addr,
        "POST /analyse HTTP/1.1\r\nContent-Transfer-Encoding: base64",
        encoded.as_bytes(),
    );
    assert_eq!(status, 200);
    assert_eq!(body, r#"{"frameCount":4}"#);

    let (status, _, body) = send(addr, "POST /analyse HTTP/1.1", b"");
    assert_eq!(status, 400);
    assert!(body.contains("error"));

    let (status, _, body) = send(addr, "GET /ping HTTP/1.1", b"");
    assert_eq!(status, 200);
    let ping: serde_json::Value = serde_json::from_str(&body).expect("ping json");
    assert_eq!(ping["message"], "pong");
}

#[test]
fn router_is_usable_without_a_socket() {
    let router = Router::new(Config::default());
    let method = tiny_http::Method::Post;
    let data = full_frame();
    let response = router.handle(&framecount::serve::Request {
        method: &method,
        url: "/analyse",
        base64_body: false,
        body: &data,
        request_id: "test",
    });
    assert_eq!(response.status, 200);
}
