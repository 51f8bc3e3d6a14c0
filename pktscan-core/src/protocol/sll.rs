//! Linux cooked capture (SLL) scan routine.

use super::{lookup_ethertype, HeaderScan, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flow::{KeyFields, KeyPair};

const HEADER_LEN: usize = 16;

/// Linux SLL scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SllProtocol;

impl Protocol for SllProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::SLL
    }

    fn name(&self) -> &'static str {
        "sll"
    }

    fn display_name(&self) -> &'static str {
        "Linux SLL"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let scan = match cursor.u16_at(14) {
            Some(protocol) => HeaderScan::new(HEADER_LEN, lookup_ethertype(protocol)),
            None => HeaderScan::nominal(HEADER_LEN),
        };
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        let mut fields = KeyFields::new();
        if let Some(protocol) = header.get(14..16) {
            let protocol = u16::from_be_bytes([protocol[0], protocol[1]]);
            fields.push(KeyPair::symmetric(u64::from(protocol)));
        }
        fields
    }
}
