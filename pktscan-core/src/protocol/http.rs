//! HTTP/1.x scan routine.
//!
//! Only the start line and header block are recorded; the body is the
//! terminal payload.

use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;

const REQUEST_METHODS: [&[u8]; 9] = [
    b"GET ",
    b"POST ",
    b"HEAD ",
    b"PUT ",
    b"DELETE ",
    b"OPTIONS ",
    b"PATCH ",
    b"CONNECT ",
    b"TRACE ",
];

const RESPONSE_PREFIX: &[u8] = b"HTTP/1.";

/// Length of a text header block up to and including the blank line.
pub(crate) fn header_block_len(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Header geometry for a text protocol: the header block if its end was
/// captured, otherwise everything up to the end of the wire.
pub(crate) fn text_header(cursor: &ScanCursor<'_>) -> HeaderScan {
    let length = header_block_len(cursor.available()).unwrap_or_else(|| cursor.wire_remaining());
    HeaderScan::new(length, Next::EndOfHeaders)
}

/// HTTP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpProtocol;

impl HttpProtocol {
    /// Whether the cursor sits on an HTTP request or response line.
    pub fn validate(cursor: &ScanCursor<'_>) -> bool {
        let bytes = cursor.available();
        bytes.starts_with(RESPONSE_PREFIX) || REQUEST_METHODS.iter().any(|m| bytes.starts_with(m))
    }
}

impl Protocol for HttpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::HTTP
    }

    fn name(&self) -> &'static str {
        "http"
    }

    fn display_name(&self) -> &'static str {
        "HTTP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        Self::validate(cursor).then(|| text_header(cursor))
    }
}
