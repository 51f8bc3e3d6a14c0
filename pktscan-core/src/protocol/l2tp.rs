//! L2TPv2 scan routine.

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

/// Flag bits in the first header word.
const FLAG_TYPE: u16 = 0x8000;
const FLAG_LENGTH: u16 = 0x4000;
const FLAG_SEQUENCE: u16 = 0x0800;
const FLAG_OFFSET: u16 = 0x0200;
const VERSION_MASK: u16 = 0x000f;

/// Flags word, tunnel id and session id.
const MIN_HEADER_LEN: usize = 6;

/// L2TP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2tpProtocol;

impl Protocol for L2tpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::L2TP
    }

    fn name(&self) -> &'static str {
        "l2tp"
    }

    fn display_name(&self) -> &'static str {
        "L2TP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let Some(flags) = cursor.u16_at(0) else {
            return Some(HeaderScan::nominal(MIN_HEADER_LEN));
        };
        if flags & VERSION_MASK != 2 {
            return None;
        }

        let mut length = MIN_HEADER_LEN;
        if flags & FLAG_LENGTH != 0 {
            length += 2;
        }
        if flags & FLAG_SEQUENCE != 0 {
            length += 4;
        }
        if flags & FLAG_OFFSET != 0 {
            // Offset size field followed by that many padding bytes.
            match cursor.u16_at(length) {
                Some(pad) => length += 2 + usize::from(pad),
                None => return Some(HeaderScan::nominal(length + 2)),
            }
        }

        let next = if flags & FLAG_TYPE != 0 {
            Next::EndOfHeaders
        } else {
            Next::Protocol(ProtocolId::PPP)
        };
        Some(HeaderScan::new(length, next))
    }
}
