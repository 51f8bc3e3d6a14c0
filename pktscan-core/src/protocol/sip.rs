//! SIP scan routine.

use super::http::text_header;
use super::{HeaderScan, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

const REQUEST_METHODS: [&[u8]; 14] = [
    b"INVITE ",
    b"REGISTER ",
    b"ACK ",
    b"BYE ",
    b"CANCEL ",
    b"OPTIONS ",
    b"SUBSCRIBE ",
    b"NOTIFY ",
    b"MESSAGE ",
    b"INFO ",
    b"PRACK ",
    b"UPDATE ",
    b"REFER ",
    b"PUBLISH ",
];

const RESPONSE_PREFIX: &[u8] = b"SIP/2.0 ";
const REQUEST_SUFFIX: &[u8] = b" SIP/2.0";

fn first_line(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(bytes.len());
    &bytes[..end]
}

/// SIP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipProtocol;

impl SipProtocol {
    /// Whether the cursor sits on a SIP status line, or on a request line
    /// ending in the SIP version.
    pub fn validate(cursor: &ScanCursor<'_>) -> bool {
        let bytes = cursor.available();
        if bytes.starts_with(RESPONSE_PREFIX) {
            return true;
        }
        REQUEST_METHODS.iter().any(|m| bytes.starts_with(m))
            && first_line(bytes).ends_with(REQUEST_SUFFIX)
    }
}

impl Protocol for SipProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::SIP
    }

    fn name(&self) -> &'static str {
        "sip"
    }

    fn display_name(&self) -> &'static str {
        "SIP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        Self::validate(cursor).then(|| text_header(cursor))
    }
}
