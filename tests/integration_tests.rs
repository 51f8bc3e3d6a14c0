//! Integration tests for pktscan.
//!
//! Tests the command-line pipeline (argument parsing, scanning, output) on
//! synthetic packets.

use clap::Parser;
use etherparse::PacketBuilder;
use pktscan::cli::{Args, LinkType, OutputFormat, OutputFormatter};
use pktscan_core::{ProtocolId, Scanner, ScannerConfig, SharedRegistry};
use std::sync::Arc;

/// Build an Ethernet/IPv4/TCP packet with an HTTP request payload.
fn build_http_packet() -> Vec<u8> {
    let request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4([192, 168, 1, 100], [192, 168, 1, 200], 64)
        .tcp(49152, 80, 1, 65535);
    let mut packet = Vec::new();
    builder.write(&mut packet, request).unwrap();
    packet
}

/// Build a raw IPv6/UDP datagram (no link layer).
fn build_ipv6_udp_packet() -> Vec<u8> {
    let builder = PacketBuilder::ipv6([0xfe; 16], [0xfd; 16], 64).udp(40000, 53);
    let mut packet = Vec::new();
    builder.write(&mut packet, &[0u8; 24]).unwrap();
    packet
}

/// Run the same steps as the binary and return stdout.
fn run(args: &[&str]) -> anyhow::Result<String> {
    let args = Args::try_parse_from(args)?;
    let packet = args.packet_bytes()?;
    let config = ScannerConfig::new()
        .max_headers(args.max_headers)
        .dissect_subheaders(args.subheaders);
    let mut scanner = Scanner::new(Arc::new(SharedRegistry::builtin()), config)?;
    let record = scanner.scan_with_wire_len(
        &packet,
        args.wire_len.unwrap_or(packet.len()),
        args.link.first_protocol(),
    );
    let view = scanner.view(&record)?;
    let mut output = Vec::new();
    OutputFormatter::new(args.format).write(&view, &mut output)?;
    Ok(String::from_utf8(output)?)
}

#[test]
fn test_hex_packet_json() {
    let packet = hex::encode(build_http_packet());
    let output = run(&["pktscan", "--hex", &packet, "--format", "json"]).unwrap();
    let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();

    let protocols: Vec<&str> = value["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["protocol"].as_str().unwrap())
        .collect();
    assert_eq!(protocols, vec!["ethernet", "ipv4", "tcp", "http"]);
    assert_eq!(value["end"], "terminal");
    assert_eq!(value["headers"][3]["offset"], 54);
    assert_eq!(value["payload_len"], 0);
}

#[test]
fn test_packet_file_csv() {
    let dir = std::env::temp_dir().join(format!("pktscan-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("packet.bin");
    std::fs::write(&path, build_ipv6_udp_packet()).unwrap();

    let output = run(&[
        "pktscan",
        path.to_str().unwrap(),
        "--link",
        "ipv6",
        "--format",
        "csv",
    ])
    .unwrap();
    let rows: Vec<&str> = output.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("0,ipv6,0,0,40,"));
    assert!(rows[1].starts_with("1,udp,40,0,8,0,24,"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_wire_len_marks_truncation() {
    let packet = build_http_packet();
    let captured = hex::encode(&packet[..40]);
    let wire_len = packet.len().to_string();
    let output = run(&[
        "pktscan",
        "--hex",
        &captured,
        "--wire-len",
        &wire_len,
        "--format",
        "json",
    ])
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(value["end"], "truncated");
    assert_eq!(value["captured_len"], 40);
    assert_eq!(value["headers"][2]["length"], 6);
}

#[test]
fn test_table_lists_tcp_options() {
    // Ethernet/IPv4/TCP with an MSS option and a NOP pad.
    let mut packet = vec![0x02, 0, 0, 0, 0, 2, 0x02, 0, 0, 0, 0, 1, 0x08, 0x00];
    packet.extend_from_slice(&[
        0x45, 0x00, 0x00, 0x2c, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 0, 0, 1, 10,
        0, 0, 2,
    ]);
    packet.extend_from_slice(&[
        0xc0, 0x00, 0x01, 0xbb, 0, 0, 0, 1, 0, 0, 0, 0, 0x60, 0x02, 0xff, 0xff, 0, 0, 0, 0,
    ]);
    packet.extend_from_slice(&[0x02, 0x04, 0x05, 0xb4]);

    let output = run(&["pktscan", "--hex", &hex::encode(&packet), "--subheaders"]).unwrap();
    assert!(output.contains("parent"));
    assert!(output.contains("2 (tcp)"));
    assert!(output.contains("end: terminal"));
}

#[test]
fn test_invalid_input_is_error() {
    assert!(run(&["pktscan", "--hex", "xyz"]).is_err());
    assert!(run(&["pktscan"]).is_err());
    assert!(run(&["pktscan", "--hex", "00", "--max-headers", "0"]).is_err());
}

#[test]
fn test_link_types() {
    let args = Args::try_parse_from(["pktscan", "--link", "sll", "--hex", "00"]).unwrap();
    assert_eq!(args.link, LinkType::Sll);
    assert_eq!(args.link.first_protocol(), ProtocolId::SLL);
    assert_eq!(args.format, OutputFormat::Table);
    assert!(Args::try_parse_from(["pktscan", "--link", "token-ring"]).is_err());
}
