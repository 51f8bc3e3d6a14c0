//! IPv6 scan routine with extension header walk.

use super::{fold_be, lookup_ip_protocol, HeaderScan, Next, Protocol, ProtocolId, SubHeaderSink};
use crate::cursor::ScanCursor;
use crate::flags::HeaderFlags;
use crate::flow::{KeyFields, KeyPair};

/// Fixed header length.
const HEADER_LEN: usize = 40;

/// Smallest extension header; used as the claimed length of one that could
/// not be read.
const MIN_EXTENSION_LEN: usize = 8;

/// Extension headers followed before giving up on a chain.
const MAX_EXTENSIONS: usize = 8;

/// IPv6 Next Header values for extension headers.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const ESP: u8 = 50;
    pub const AH: u8 = 51;
    pub const NO_NEXT_HEADER: u8 = 59;
    pub const DESTINATION: u8 = 60;
    pub const MOBILITY: u8 = 135;
}

/// Check if a next header value is an extension header.
///
/// ESP is not: everything after it is encrypted payload.
fn is_extension_header(nh: u8) -> bool {
    matches!(
        nh,
        next_header::HOP_BY_HOP
            | next_header::ROUTING
            | next_header::FRAGMENT
            | next_header::DESTINATION
            | next_header::AH
            | next_header::MOBILITY
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExtensionWalk {
    next_header: u8,
    length: usize,
    fragmented: bool,
    later_fragment: bool,
    complete: bool,
}

/// Follow the extension chain in `bytes` (which start right after the fixed
/// header), calling `visit(code, offset, length)` for each extension.
fn walk_extensions(bytes: &[u8], first: u8, mut visit: impl FnMut(u8, usize, usize)) -> ExtensionWalk {
    let mut walk = ExtensionWalk {
        next_header: first,
        length: 0,
        fragmented: false,
        later_fragment: false,
        complete: true,
    };
    let mut count = 0;
    while is_extension_header(walk.next_header) {
        if count == MAX_EXTENSIONS {
            walk.complete = false;
            break;
        }
        let pos = walk.length;
        let (Some(&next), Some(&len_byte)) = (bytes.get(pos), bytes.get(pos + 1)) else {
            visit(walk.next_header, pos, MIN_EXTENSION_LEN);
            walk.length += MIN_EXTENSION_LEN;
            walk.complete = false;
            break;
        };
        let length = match walk.next_header {
            next_header::FRAGMENT => {
                if let Some(word) = bytes.get(pos + 2..pos + 4) {
                    let word = u16::from_be_bytes([word[0], word[1]]);
                    let offset = word >> 3;
                    walk.fragmented |= offset != 0 || word & 0x0001 != 0;
                    walk.later_fragment |= offset != 0;
                }
                8
            }
            next_header::AH => (usize::from(len_byte) + 2) * 4,
            _ => (usize::from(len_byte) + 1) * 8,
        };
        visit(walk.next_header, pos, length);
        walk.length += length;
        walk.next_header = next;
        count += 1;
        if walk.later_fragment {
            break;
        }
    }
    walk
}

/// IPv6 scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Protocol;

impl Protocol for Ipv6Protocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::IPV6
    }

    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let Some(first) = cursor.u8_at(6) else {
            return Some(HeaderScan::nominal(HEADER_LEN));
        };
        let extensions = cursor.available().get(HEADER_LEN..).unwrap_or(&[]);
        let walk = walk_extensions(extensions, first, |_, _, _| {});

        let mut scan = HeaderScan::nominal(HEADER_LEN + walk.length);
        // Zero payload length is a jumbogram; leave the payload to the wire.
        if let Some(payload_len) = cursor.u16_at(4).map(usize::from) {
            if payload_len != 0 && payload_len >= walk.length {
                scan = scan.with_payload(payload_len - walk.length);
            }
        }
        if walk.fragmented {
            // Upper-layer lengths describe the whole datagram, not this fragment.
            scan.flags |= HeaderFlags::CUMULATIVE;
        }
        if walk.complete && !walk.later_fragment {
            scan.next = lookup_ip_protocol(walk.next_header);
        }
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        let (Some(src), Some(dst), Some(&first)) =
            (header.get(8..24), header.get(24..40), header.get(6))
        else {
            return fields;
        };
        let extensions = header.get(HEADER_LEN..).unwrap_or(&[]);
        let walk = walk_extensions(extensions, first, |_, _, _| {});
        fields.push(KeyPair::reversible(fold_be(src), fold_be(dst)));
        fields.push(KeyPair::symmetric(u64::from(walk.next_header)));
        fields
    }

    fn dissect_subheaders(&self, header: &[u8], sink: &mut SubHeaderSink<'_>) {
        let (Some(&first), Some(extensions)) = (header.get(6), header.get(HEADER_LEN..)) else {
            return;
        };
        walk_extensions(extensions, first, |code, pos, length| {
            let available = extensions.len().saturating_sub(pos);
            if length > available {
                sink.push(code, HEADER_LEN + pos, available, HeaderFlags::HEADER_TRUNCATED);
            } else {
                sink.push(code, HEADER_LEN + pos, length, HeaderFlags::empty());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{ipv6_extension, ipv6_fragment, Ipv6Builder};

    fn scan(bytes: &[u8]) -> HeaderScan {
        let cursor = ScanCursor::new(bytes, bytes.len(), ProtocolId::IPV6);
        Ipv6Protocol.scan(&cursor).unwrap()
    }

    #[test]
    fn test_scan_ipv6_udp() {
        let packet = Ipv6Builder::new().next_header(17).payload(vec![0; 12]).build();
        let result = scan(&packet);
        assert_eq!(result.length, 40);
        assert_eq!(result.payload, Some(12));
        assert_eq!(result.next, Next::Protocol(ProtocolId::UDP));
    }

    #[test]
    fn test_extension_headers_extend_length() {
        let mut extensions = ipv6_extension(next_header::DESTINATION);
        extensions.extend(ipv6_extension(6));
        let packet = Ipv6Builder::new()
            .next_header(next_header::HOP_BY_HOP)
            .extensions(extensions)
            .payload(vec![0; 20])
            .build();
        let result = scan(&packet);
        assert_eq!(result.length, 56);
        assert_eq!(result.payload, Some(20));
        assert_eq!(result.next, Next::Protocol(ProtocolId::TCP));
    }

    #[test]
    fn test_first_fragment() {
        let packet = Ipv6Builder::new()
            .next_header(next_header::FRAGMENT)
            .extensions(ipv6_fragment(17, 0, true))
            .payload(vec![0; 16])
            .build();
        let result = scan(&packet);
        assert!(result.flags.is_fragmented());
        assert!(result.flags.ignores_bounds());
        assert_eq!(result.length, 48);
        assert_eq!(result.next, Next::Protocol(ProtocolId::UDP));
    }

    #[test]
    fn test_later_fragment_is_payload() {
        let packet = Ipv6Builder::new()
            .next_header(next_header::FRAGMENT)
            .extensions(ipv6_fragment(17, 185, false))
            .payload(vec![0; 16])
            .build();
        let result = scan(&packet);
        assert!(result.flags.is_fragmented());
        assert!(result.flags.ignores_bounds());
        assert_eq!(result.next, Next::Payload);
    }

    #[test]
    fn test_no_next_header_ends_chain() {
        let packet = Ipv6Builder::new().next_header(next_header::NO_NEXT_HEADER).build();
        assert_eq!(scan(&packet).next, Next::EndOfHeaders);
    }

    #[test]
    fn test_unreadable_extension_claims_minimum() {
        let packet = Ipv6Builder::new().next_header(next_header::ROUTING).build();
        let result = scan(&packet[..41]);
        assert_eq!(result.length, 48);
        assert_eq!(result.next, Next::Payload);
    }

    #[test]
    fn test_flow_key_uses_final_next_header() {
        let packet = Ipv6Builder::new()
            .next_header(next_header::HOP_BY_HOP)
            .extensions(ipv6_extension(17))
            .build();
        let fields = Ipv6Protocol.flow_key(&packet);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1], KeyPair::symmetric(17));
        assert!(fields[0].reversible);
    }
}
