//! PPP scan routine.

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

/// All-stations address and unnumbered-information control bytes.
const ADDRESS: u8 = 0xff;
const CONTROL: u8 = 0x03;

/// PPP protocol field values.
pub mod ppp_protocol {
    pub const IPV4: u16 = 0x0021;
    pub const IPV6: u16 = 0x0057;
}

/// PPP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PppProtocol;

impl Protocol for PppProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::PPP
    }

    fn name(&self) -> &'static str {
        "ppp"
    }

    fn display_name(&self) -> &'static str {
        "PPP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        // Address/control may be compressed away.
        let (length, protocol_at) = match (cursor.u8_at(0), cursor.u8_at(1)) {
            (Some(ADDRESS), Some(CONTROL)) => (4, 2),
            (Some(_), Some(_)) => (2, 0),
            _ => return Some(HeaderScan::nominal(4)),
        };
        let next = match cursor.u16_at(protocol_at) {
            Some(ppp_protocol::IPV4) => Next::Protocol(ProtocolId::IPV4),
            Some(ppp_protocol::IPV6) => Next::Protocol(ProtocolId::IPV6),
            _ => Next::Payload,
        };
        Some(HeaderScan::new(length, next))
    }
}
