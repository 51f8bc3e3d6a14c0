//! Ethernet II / IEEE 802.3 scan routine.

use super::{fold_be, HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flow::{KeyFields, KeyPair};

/// Ethernet header length (dst MAC + src MAC + type/length).
pub const HEADER_LEN: usize = 14;

/// Type/length values below this are 802.3 payload lengths.
pub const MAX_8023_LENGTH: u16 = 0x0600;

/// Well-known EtherType values (IEEE 802).
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
    /// Pre-standard 802.1ad tag still seen on some switches.
    pub const QINQ_LEGACY: u16 = 0x9100;
}

/// Map an ethertype to the protocol that follows.
pub(crate) fn lookup_ethertype(value: u16) -> Next {
    match value {
        ethertype::IPV4 => Next::Protocol(ProtocolId::IPV4),
        ethertype::IPV6 => Next::Protocol(ProtocolId::IPV6),
        ethertype::ARP => Next::Protocol(ProtocolId::ARP),
        ethertype::VLAN | ethertype::QINQ | ethertype::QINQ_LEGACY => {
            Next::Protocol(ProtocolId::VLAN)
        }
        _ => Next::Payload,
    }
}

/// Geometry for a type/length field: an 802.3 length declares the payload
/// and an LLC header follows; anything else is an ethertype.
pub(crate) fn type_or_length(header_len: usize, value: u16) -> HeaderScan {
    if value < MAX_8023_LENGTH {
        HeaderScan::new(header_len, Next::Protocol(ProtocolId::LLC)).with_payload(usize::from(value))
    } else {
        HeaderScan::new(header_len, lookup_ethertype(value))
    }
}

/// Ethernet scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetProtocol;

impl Protocol for EthernetProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::ETHERNET
    }

    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let scan = match cursor.u16_at(12) {
            Some(value) => type_or_length(HEADER_LEN, value),
            None => HeaderScan::nominal(HEADER_LEN),
        };
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        if let (Some(dst), Some(src)) = (header.get(0..6), header.get(6..12)) {
            fields.push(KeyPair::reversible(fold_be(src), fold_be(dst)));
        }
        fields
    }
}
