//! IEEE 802.2 LLC scan routine.

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

/// SAP value announcing a SNAP header.
const SAP_SNAP: u8 = 0xAA;

/// LLC scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcProtocol;

impl Protocol for LlcProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::LLC
    }

    fn name(&self) -> &'static str {
        "llc"
    }

    fn display_name(&self) -> &'static str {
        "802.2 LLC"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let (Some(dsap), Some(ssap), Some(control)) =
            (cursor.u8_at(0), cursor.u8_at(1), cursor.u8_at(2))
        else {
            return Some(HeaderScan::nominal(3));
        };
        // Unnumbered frames carry a one-byte control field, I and S frames two.
        let length = if control & 0x03 == 0x03 { 3 } else { 4 };
        let next = if dsap == SAP_SNAP && ssap == SAP_SNAP {
            Next::Protocol(ProtocolId::SNAP)
        } else {
            Next::Payload
        };
        Some(HeaderScan::new(length, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(bytes: &[u8]) -> HeaderScan {
        let cursor = ScanCursor::new(bytes, bytes.len(), ProtocolId::LLC);
        LlcProtocol.scan(&cursor).unwrap()
    }

    #[test]
    fn test_snap_follows() {
        let result = scan(&[0xaa, 0xaa, 0x03, 0, 0, 0, 0x08, 0x00]);
        assert_eq!(result.length, 3);
        assert_eq!(result.next, Next::Protocol(ProtocolId::SNAP));
    }

    #[test]
    fn test_stp_is_payload() {
        let result = scan(&[0x42, 0x42, 0x03, 0x00, 0x00]);
        assert_eq!(result.next, Next::Payload);
    }

    #[test]
    fn test_information_frame_has_two_byte_control() {
        let result = scan(&[0xf0, 0xf0, 0x00, 0x01]);
        assert_eq!(result.length, 4);
    }
}
