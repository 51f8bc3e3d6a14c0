//! TCP scan routine.

use super::options::dissect_options;
use super::{HeaderScan, Next, Protocol, ProtocolId, SubHeaderSink};
use crate::cursor::ScanCursor;
use crate::flow::{KeyFields, KeyPair};

/// Header length without options.
const MIN_HEADER_LEN: usize = 20;

/// Ports statically bound to HTTP.
const HTTP_PORTS: [u16; 2] = [80, 8080];

/// TCP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::TCP
    }

    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let Some(offset_byte) = cursor.u8_at(12) else {
            return Some(HeaderScan::nominal(MIN_HEADER_LEN));
        };
        let length = usize::from(offset_byte >> 4) * 4;
        if length < MIN_HEADER_LEN {
            return Some(HeaderScan::nominal(MIN_HEADER_LEN));
        }
        let next = match (cursor.u16_at(0), cursor.u16_at(2)) {
            (Some(src), Some(dst)) if HTTP_PORTS.contains(&src) || HTTP_PORTS.contains(&dst) => {
                Next::Protocol(ProtocolId::HTTP)
            }
            _ => Next::Payload,
        };
        Some(HeaderScan::new(length, next))
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        port_pair(header)
    }

    fn dissect_subheaders(&self, header: &[u8], sink: &mut SubHeaderSink<'_>) {
        if let Some(options) = header.get(MIN_HEADER_LEN..) {
            dissect_options(options, MIN_HEADER_LEN, sink);
        }
    }
}

/// Source and destination ports from the first four header bytes.
pub(crate) fn port_pair(header: &[u8]) -> KeyFields {
    let mut fields = KeyFields::new();
    if let Some(ports) = header.get(0..4) {
        let src = u16::from_be_bytes([ports[0], ports[1]]);
        let dst = u16::from_be_bytes([ports[2], ports[3]]);
        fields.push(KeyPair::reversible(u64::from(src), u64::from(dst)));
    }
    fields
}
