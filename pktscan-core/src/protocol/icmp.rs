//! ICMP (v4) scan routine.

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flags::HeaderFlags;

const HEADER_LEN: usize = 8;

/// ICMP message types that quote the offending IPv4 header.
pub mod icmp_type {
    pub const DEST_UNREACHABLE: u8 = 3;
    pub const SOURCE_QUENCH: u8 = 4;
    pub const REDIRECT: u8 = 5;
    pub const TIME_EXCEEDED: u8 = 11;
    pub const PARAMETER_PROBLEM: u8 = 12;
}

/// ICMP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpProtocol;

impl Protocol for IcmpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::ICMP
    }

    fn name(&self) -> &'static str {
        "icmp"
    }

    fn display_name(&self) -> &'static str {
        "ICMP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let scan = match cursor.u8_at(0) {
            Some(
                icmp_type::DEST_UNREACHABLE
                | icmp_type::SOURCE_QUENCH
                | icmp_type::REDIRECT
                | icmp_type::TIME_EXCEEDED
                | icmp_type::PARAMETER_PROBLEM,
            ) => {
                // The quoted datagram is cut short; its length fields lie.
                HeaderScan::new(HEADER_LEN, Next::Protocol(ProtocolId::IPV4))
                    .with_flags(HeaderFlags::IGNORE_BOUNDS)
            }
            Some(_) => HeaderScan::new(HEADER_LEN, Next::EndOfHeaders),
            None => HeaderScan::nominal(HEADER_LEN),
        };
        Some(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(bytes: &[u8]) -> HeaderScan {
        let cursor = ScanCursor::new(bytes, bytes.len(), ProtocolId::ICMP);
        IcmpProtocol.scan(&cursor).unwrap()
    }

    #[test]
    fn test_echo_request_ends_chain() {
        let result = scan(&[8, 0, 0, 0, 0, 1, 0, 1]);
        assert_eq!(result.length, 8);
        assert_eq!(result.next, Next::EndOfHeaders);
        assert!(!result.flags.ignores_bounds());
    }

    #[test]
    fn test_unreachable_quotes_ipv4() {
        let result = scan(&[3, 3, 0, 0, 0, 0, 0, 0]);
        assert_eq!(result.next, Next::Protocol(ProtocolId::IPV4));
        assert!(result.flags.ignores_bounds());
    }
}
