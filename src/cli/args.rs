//! Command-line argument definitions.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use pktscan_core::ProtocolId;

use super::OutputFormat;

/// Link layer the first header is decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LinkType {
    /// Ethernet II / IEEE 802.3 (pcap linktype 1)
    Ethernet,
    /// Linux cooked capture (pcap linktype 113)
    Sll,
    /// Raw IPv4 (pcap linktype 228)
    Ipv4,
    /// Raw IPv6 (pcap linktype 229)
    Ipv6,
    /// PPP (pcap linktype 9)
    Ppp,
}

impl LinkType {
    /// Protocol id the scan starts with.
    pub fn first_protocol(self) -> ProtocolId {
        match self {
            LinkType::Ethernet => ProtocolId::ETHERNET,
            LinkType::Sll => ProtocolId::SLL,
            LinkType::Ipv4 => ProtocolId::IPV4,
            LinkType::Ipv6 => ProtocolId::IPV6,
            LinkType::Ppp => ProtocolId::PPP,
        }
    }
}

/// Dissect the protocol header chain of a captured packet.
#[derive(Parser, Debug)]
#[command(name = "pktscan")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File holding the raw packet bytes
    #[arg(value_name = "FILE", conflicts_with = "hex")]
    pub file: Option<PathBuf>,

    /// Packet bytes as hex (whitespace, ':' and a leading 0x are ignored)
    #[arg(long = "hex", value_name = "HEX")]
    pub hex: Option<String>,

    /// Link layer of the first header
    #[arg(short = 'l', long = "link", value_enum, default_value = "ethernet")]
    pub link: LinkType,

    /// Original length on the wire, if the capture was cut short
    #[arg(long = "wire-len", value_name = "BYTES")]
    pub wire_len: Option<usize>,

    /// Dissect IP options, IPv6 extension headers and TCP options
    #[arg(long = "subheaders")]
    pub subheaders: bool,

    /// Maximum number of headers recorded per packet
    #[arg(long = "max-headers", default_value = "32")]
    pub max_headers: usize,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// List registered scan routines and heuristics
    #[arg(long = "list-protocols")]
    pub list_protocols: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if this is an info-only command (no packet needed).
    pub fn is_info_only(&self) -> bool {
        self.list_protocols
    }

    /// Read the packet from `--hex` or FILE.
    pub fn packet_bytes(&self) -> Result<Vec<u8>> {
        if let Some(text) = &self.hex {
            return parse_hex(text);
        }
        match &self.file {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("Failed to read packet file: {}", path.display())),
            None => bail!("No packet given. Pass FILE or --hex; use --help for usage."),
        }
    }
}

/// Decode hex text, tolerating separators and a `0x` prefix.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    hex::decode(&digits).context("Invalid hex packet")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_separators() {
        assert_eq!(parse_hex("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(parse_hex("de:ad be-ef\n").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_link_first_protocol() {
        assert_eq!(LinkType::Sll.first_protocol(), ProtocolId::SLL);
        assert_eq!(LinkType::Ipv6.first_protocol(), ProtocolId::IPV6);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "pktscan",
            "--hex",
            "00",
            "--link",
            "ipv4",
            "--wire-len",
            "60",
            "--format",
            "json",
        ]);
        assert_eq!(args.link, LinkType::Ipv4);
        assert_eq!(args.wire_len, Some(60));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.packet_bytes().unwrap(), vec![0]);
        assert!(!args.is_info_only());
    }

    #[test]
    fn test_missing_packet_is_error() {
        let args = Args::parse_from(["pktscan", "--list-protocols"]);
        assert!(args.is_info_only());
        assert!(args.packet_bytes().is_err());
    }
}
