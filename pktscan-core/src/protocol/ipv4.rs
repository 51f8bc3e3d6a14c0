//! IPv4 scan routine.

use super::options::dissect_options;
use super::{fold_be, HeaderScan, Next, Protocol, ProtocolId, SubHeaderSink};
use crate::cursor::ScanCursor;
use crate::flags::HeaderFlags;
use crate::flow::{KeyFields, KeyPair};

/// Header length without options.
const MIN_HEADER_LEN: usize = 20;

/// More-fragments flag in the flags/fragment-offset word.
const FLAG_MF: u16 = 0x2000;

const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// IP protocol numbers understood by the built-in routines.
pub mod ip_protocol {
    pub const ICMP: u8 = 1;
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6: u8 = 41;
    pub const NO_NEXT_HEADER: u8 = 59;
}

/// Map an IP protocol number (or final IPv6 next header) to its successor.
pub(crate) fn lookup_ip_protocol(value: u8) -> Next {
    match value {
        ip_protocol::ICMP => Next::Protocol(ProtocolId::ICMP),
        ip_protocol::IPIP => Next::Protocol(ProtocolId::IPV4),
        ip_protocol::TCP => Next::Protocol(ProtocolId::TCP),
        ip_protocol::UDP => Next::Protocol(ProtocolId::UDP),
        ip_protocol::IPV6 => Next::Protocol(ProtocolId::IPV6),
        ip_protocol::NO_NEXT_HEADER => Next::EndOfHeaders,
        _ => Next::Payload,
    }
}

/// IPv4 scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Protocol;

impl Protocol for Ipv4Protocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::IPV4
    }

    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let Some(version_ihl) = cursor.u8_at(0) else {
            return Some(HeaderScan::nominal(MIN_HEADER_LEN));
        };
        let ihl = usize::from(version_ihl & 0x0f) * 4;
        if ihl < MIN_HEADER_LEN {
            return Some(HeaderScan::nominal(MIN_HEADER_LEN));
        }

        let mut scan = HeaderScan::nominal(ihl);
        if let Some(total) = cursor.u16_at(2).map(usize::from) {
            // A zero or undersized total length (segmentation offload) means
            // the payload runs to the end of the wire.
            if total >= ihl {
                scan = scan.with_payload(total - ihl);
            }
        }

        let Some(frag) = cursor.u16_at(6) else {
            return Some(scan);
        };
        let offset = frag & FRAGMENT_OFFSET_MASK;
        if frag & FLAG_MF != 0 || offset != 0 {
            // Upper-layer lengths describe the whole datagram, not this fragment.
            scan.flags |= HeaderFlags::CUMULATIVE;
        }
        if offset != 0 {
            // Later fragments carry no upper-layer header.
            return Some(scan);
        }

        if let Some(protocol) = cursor.u8_at(9) {
            scan.next = lookup_ip_protocol(protocol);
        }
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        if let (Some(src), Some(dst), Some(&protocol)) =
            (header.get(12..16), header.get(16..20), header.get(9))
        {
            fields.push(KeyPair::reversible(fold_be(src), fold_be(dst)));
            fields.push(KeyPair::symmetric(u64::from(protocol)));
        }
        fields
    }

    fn dissect_subheaders(&self, header: &[u8], sink: &mut SubHeaderSink<'_>) {
        if let Some(options) = header.get(MIN_HEADER_LEN..) {
            dissect_options(options, MIN_HEADER_LEN, sink);
        }
    }
}
