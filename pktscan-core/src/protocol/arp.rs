//! ARP scan routine.

use super::{fold_be, HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flow::{KeyFields, KeyPair};

/// Fixed part: hardware type, protocol type, lengths, operation.
const FIXED_LEN: usize = 8;

/// Length of an Ethernet/IPv4 ARP message.
const NOMINAL_LEN: usize = 28;

/// ARP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpProtocol;

impl Protocol for ArpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::ARP
    }

    fn name(&self) -> &'static str {
        "arp"
    }

    fn display_name(&self) -> &'static str {
        "ARP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let length = match (cursor.u8_at(4), cursor.u8_at(5)) {
            (Some(hlen), Some(plen)) => FIXED_LEN + 2 * (usize::from(hlen) + usize::from(plen)),
            _ => NOMINAL_LEN,
        };
        Some(HeaderScan::new(length, Next::EndOfHeaders))
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        let (Some(&hlen), Some(&plen)) = (header.get(4), header.get(5)) else {
            return fields;
        };
        let (hlen, plen) = (usize::from(hlen), usize::from(plen));
        let sender = FIXED_LEN + hlen;
        let target = FIXED_LEN + 2 * hlen + plen;
        if let (Some(spa), Some(tpa)) = (
            header.get(sender..sender + plen),
            header.get(target..target + plen),
        ) {
            fields.push(KeyPair::reversible(fold_be(spa), fold_be(tpa)));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arp_request(spa: [u8; 4], tpa: [u8; 4]) -> Vec<u8> {
        let mut msg = vec![0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01];
        msg.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        msg.extend_from_slice(&spa);
        msg.extend_from_slice(&[0; 6]);
        msg.extend_from_slice(&tpa);
        msg
    }

    #[test]
    fn test_arp_length_from_address_sizes() {
        let msg = arp_request([10, 0, 0, 1], [10, 0, 0, 2]);
        let cursor = ScanCursor::new(&msg, msg.len(), ProtocolId::ARP);
        let scan = ArpProtocol.scan(&cursor).unwrap();
        assert_eq!(scan.length, 28);
        assert_eq!(scan.next, Next::EndOfHeaders);
    }

    #[test]
    fn test_arp_flow_key_uses_protocol_addresses() {
        let fields = ArpProtocol.flow_key(&arp_request([10, 0, 0, 1], [10, 0, 0, 2]));
        assert_eq!(
            fields.as_slice(),
            &[KeyPair::reversible(0x0a00_0001, 0x0a00_0002)]
        );
    }

    #[test]
    fn test_arp_flow_key_short_header() {
        let msg = arp_request([10, 0, 0, 1], [10, 0, 0, 2]);
        assert!(ArpProtocol.flow_key(&msg[..20]).is_empty());
    }
}
