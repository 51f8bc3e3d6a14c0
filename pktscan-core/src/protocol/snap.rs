//! SNAP scan routine.

use super::{lookup_ethertype, HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

const HEADER_LEN: usize = 5;

/// SNAP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapProtocol;

impl Protocol for SnapProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::SNAP
    }

    fn name(&self) -> &'static str {
        "snap"
    }

    fn display_name(&self) -> &'static str {
        "SNAP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let (Some(oui), Some(pid)) = (cursor.bytes(0, 3), cursor.u16_at(3)) else {
            return Some(HeaderScan::nominal(HEADER_LEN));
        };
        // Only the zero OUI carries an ethertype as protocol id.
        let next = if oui == [0, 0, 0] {
            lookup_ethertype(pid)
        } else {
            Next::Payload
        };
        Some(HeaderScan::new(HEADER_LEN, next))
    }
}
