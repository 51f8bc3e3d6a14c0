//! RTP scan routine.

use std::ops::RangeInclusive;

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

/// Fixed header length.
const HEADER_LEN: usize = 12;

/// Extension header prefix (profile id + length in words).
const EXTENSION_LEN: usize = 4;

const VERSION: u8 = 2;
const FLAG_PADDING: u8 = 0x20;
const FLAG_EXTENSION: u8 = 0x10;

/// RTCP packet types 200..=204 with the marker bit folded away.
const RTCP_TYPES: RangeInclusive<u8> = 72..=76;

/// RTP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpProtocol;

impl RtpProtocol {
    /// Version 2 header with a payload type outside the RTCP range.
    pub fn validate(cursor: &ScanCursor<'_>) -> bool {
        let Some(fixed) = cursor.bytes(0, HEADER_LEN) else {
            return false;
        };
        fixed[0] >> 6 == VERSION && !RTCP_TYPES.contains(&(fixed[1] & 0x7f))
    }
}

impl Protocol for RtpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::RTP
    }

    fn name(&self) -> &'static str {
        "rtp"
    }

    fn display_name(&self) -> &'static str {
        "RTP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let Some(first) = cursor.u8_at(0) else {
            return Some(HeaderScan::new(HEADER_LEN, Next::EndOfHeaders));
        };
        let mut length = HEADER_LEN + 4 * usize::from(first & 0x0f);
        if first & FLAG_EXTENSION != 0 {
            length += EXTENSION_LEN;
            if let Some(words) = cursor.u16_at(length - 2) {
                length += 4 * usize::from(words);
            }
        }

        let mut scan = HeaderScan::new(length, Next::EndOfHeaders);
        if first & FLAG_PADDING != 0 {
            // The last byte of the packet counts the padding, itself included.
            let pad = cursor
                .wire_remaining()
                .checked_sub(1)
                .and_then(|last| cursor.u8_at(last));
            if let Some(pad) = pad {
                scan = scan.with_postfix(usize::from(pad));
            }
        }
        Some(scan)
    }
}
