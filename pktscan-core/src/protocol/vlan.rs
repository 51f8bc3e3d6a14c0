//! IEEE 802.1Q VLAN tag scan routine.

use super::ethernet::type_or_length;
use super::{HeaderScan, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flow::{KeyFields, KeyPair};

const TAG_LEN: usize = 4;

/// VLAN scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanProtocol;

impl Protocol for VlanProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::VLAN
    }

    fn name(&self) -> &'static str {
        "vlan"
    }

    fn display_name(&self) -> &'static str {
        "802.1Q VLAN"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let scan = match cursor.u16_at(2) {
            Some(inner) => type_or_length(TAG_LEN, inner),
            None => HeaderScan::nominal(TAG_LEN),
        };
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        if let Some(tci) = header.get(0..2) {
            let vid = u16::from_be_bytes([tci[0], tci[1]]) & 0x0fff;
            fields.push(KeyPair::symmetric(u64::from(vid)));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::vlan_tag;
    use crate::protocol::{ethertype, Next};

    #[test]
    fn test_parse_vlan_basic() {
        let tag = vlan_tag(100, ethertype::IPV4);
        let cursor = ScanCursor::new(&tag, tag.len(), ProtocolId::VLAN);
        let scan = VlanProtocol.scan(&cursor).unwrap();
        assert_eq!(scan.length, 4);
        assert_eq!(scan.next, Next::Protocol(ProtocolId::IPV4));
    }

    #[test]
    fn test_stacked_tag() {
        let tag = vlan_tag(10, ethertype::VLAN);
        let cursor = ScanCursor::new(&tag, tag.len(), ProtocolId::VLAN);
        assert_eq!(
            VlanProtocol.scan(&cursor).unwrap().next,
            Next::Protocol(ProtocolId::VLAN)
        );
    }

    #[test]
    fn test_flow_key_vid_only() {
        let mut tag = vlan_tag(100, ethertype::IPV6);
        tag[0] |= 0xe0; // priority bits do not change the key
        let fields = VlanProtocol.flow_key(&tag);
        assert_eq!(fields.as_slice(), &[KeyPair::symmetric(100)]);
    }
}
