//! UDP scan routine.

use super::tcp::port_pair;
use super::{HeaderScan, Next, Protocol, ProtocolId};
use crate::cursor::ScanCursor;
use crate::flow::KeyFields;

const HEADER_LEN: usize = 8;

/// Well-known UDP ports with static bindings.
pub mod port {
    pub const L2TP: u16 = 1701;
    pub const SIP: u16 = 5060;
}

fn lookup_port(value: u16) -> Option<ProtocolId> {
    match value {
        port::SIP => Some(ProtocolId::SIP),
        port::L2TP => Some(ProtocolId::L2TP),
        _ => None,
    }
}

/// UDP scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn id(&self) -> ProtocolId {
        ProtocolId::UDP
    }

    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        let mut scan = HeaderScan::nominal(HEADER_LEN);
        if let Some(length) = cursor.u16_at(4).map(usize::from) {
            if length >= HEADER_LEN {
                scan = scan.with_payload(length - HEADER_LEN);
            }
        }
        if let (Some(src), Some(dst)) = (cursor.u16_at(0), cursor.u16_at(2)) {
            if let Some(id) = lookup_port(dst).or_else(|| lookup_port(src)) {
                scan.next = Next::Protocol(id);
            }
        }
        Some(scan)
    }

    fn flow_key(&self, header: &[u8]) -> KeyFields {
        port_pair(header)
    }
}
