//! Protocol identifiers, scan routine traits and the built-in routines.
//!
//! A scan routine looks at the bytes at the cursor and reports the geometry
//! of one header: how long it is, how much payload it declares, and which
//! protocol follows. Routines never enforce bounds themselves; the driver
//! clips every region against the captured data.

mod arp;
mod ethernet;
mod http;
mod icmp;
mod ipv4;
mod ipv6;
mod l2tp;
mod llc;
mod options;
mod ppp;
mod registry;
mod rtp;
mod sip;
mod sll;
mod snap;
mod tcp;
mod udp;
mod vlan;

#[cfg(test)]
pub mod test_utils;

use std::fmt;

pub use arp::ArpProtocol;
pub use ethernet::{ethertype, EthernetProtocol};
pub use http::HttpProtocol;
pub use icmp::IcmpProtocol;
pub use ipv4::{ip_protocol, Ipv4Protocol};
pub use ipv6::{next_header, Ipv6Protocol};
pub use l2tp::L2tpProtocol;
pub use llc::LlcProtocol;
pub use ppp::PppProtocol;
pub use registry::{
    BuiltinProtocol, HeaderScanner, HeuristicValidator, Registry, ScanRoutine, SharedRegistry,
    Validator,
};
pub use rtp::RtpProtocol;
pub use sip::SipProtocol;
pub use sll::SllProtocol;
pub use snap::SnapProtocol;
pub use tcp::TcpProtocol;
pub use udp::UdpProtocol;
pub use vlan::VlanProtocol;

pub(crate) use ethernet::lookup_ethertype;
pub(crate) use ipv4::lookup_ip_protocol;

use crate::arena::{ArenaSpan, RecordArena};
use crate::cursor::ScanCursor;
use crate::error::RegistryError;
use crate::flags::HeaderFlags;
use crate::flow::KeyFields;
use crate::record::SubHeaderRecord;

/// Size of the protocol id space.
pub const MAX_ID_COUNT: usize = 64;

/// First id available to externally registered handlers.
pub const FIRST_CUSTOM_ID: u8 = 32;

/// Numeric protocol identifier in `0..MAX_ID_COUNT`.
///
/// Id 0 is [`ProtocolId::PAYLOAD`], the terminal marker. Built-in protocols
/// have stable ids below [`FIRST_CUSTOM_ID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(u8);

impl ProtocolId {
    pub const PAYLOAD: Self = Self(0);
    pub const ETHERNET: Self = Self(1);
    pub const TCP: Self = Self(2);
    pub const UDP: Self = Self(3);
    pub const LLC: Self = Self(4);
    pub const SNAP: Self = Self(5);
    pub const IPV4: Self = Self(6);
    pub const IPV6: Self = Self(7);
    pub const VLAN: Self = Self(8);
    pub const L2TP: Self = Self(9);
    pub const PPP: Self = Self(10);
    pub const ICMP: Self = Self(11);
    pub const HTTP: Self = Self(12);
    pub const ARP: Self = Self(13);
    pub const SIP: Self = Self(14);
    pub const RTP: Self = Self(15);
    pub const SLL: Self = Self(16);

    /// Id for `raw`, or `None` if it is outside the id space.
    pub const fn new(raw: u8) -> Option<Self> {
        if (raw as usize) < MAX_ID_COUNT {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Id in the range reserved for external handlers.
    pub const fn custom(raw: u8) -> Option<Self> {
        if raw >= FIRST_CUSTOM_ID && (raw as usize) < MAX_ID_COUNT {
            Some(Self(raw))
        } else {
            None
        }
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Bit for this id in a header-presence bitmap.
    #[inline]
    pub const fn bit(self) -> u64 {
        1u64 << self.0
    }

    #[inline]
    pub const fn is_payload(self) -> bool {
        self.0 == 0
    }

    pub fn builtin(self) -> Option<BuiltinProtocol> {
        BuiltinProtocol::from_id(self)
    }
}

impl TryFrom<u8> for ProtocolId {
    type Error = RegistryError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(RegistryError::IdOutOfRange {
            id: raw,
            max: MAX_ID_COUNT,
        })
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_payload() {
            return f.write_str("payload");
        }
        match self.builtin() {
            Some(protocol) => f.write_str(protocol.name()),
            None => write!(f, "proto{}", self.0),
        }
    }
}

/// Successor reported by a scan routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Statically bound successor.
    Protocol(ProtocolId),
    /// No static successor; heuristics may still bind one.
    Payload,
    /// Explicit stop; heuristics are not consulted.
    EndOfHeaders,
}

impl From<ProtocolId> for Next {
    fn from(id: ProtocolId) -> Self {
        if id.is_payload() {
            Next::Payload
        } else {
            Next::Protocol(id)
        }
    }
}

/// Geometry of one header as reported by its scan routine.
///
/// Layout on the wire: `prefix | header | gap | payload | postfix`. The
/// prefix starts at the cursor offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderScan {
    pub prefix: usize,
    pub length: usize,
    pub gap: usize,
    /// Declared payload length; `None` means "to the end of the wire".
    pub payload: Option<usize>,
    pub postfix: usize,
    pub next: Next,
    pub flags: HeaderFlags,
}

impl HeaderScan {
    pub fn new(length: usize, next: Next) -> Self {
        Self {
            prefix: 0,
            length,
            gap: 0,
            payload: None,
            postfix: 0,
            next,
            flags: HeaderFlags::empty(),
        }
    }

    /// Fallback geometry when the routine could not read its fields.
    pub fn nominal(length: usize) -> Self {
        Self::new(length, Next::Payload)
    }

    pub fn with_prefix(mut self, prefix: usize) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_payload(mut self, payload: usize) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_postfix(mut self, postfix: usize) -> Self {
        self.postfix = postfix;
        self
    }

    pub fn with_flags(mut self, flags: HeaderFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Built-in scan routine, dispatched statically through [`BuiltinProtocol`].
pub trait Protocol: Send + Sync {
    /// Protocol id this routine is registered under.
    fn id(&self) -> ProtocolId;

    /// Short lowercase name (e.g., "tcp").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Scan the header at the cursor. `None` means the bytes are not this
    /// protocol at all.
    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan>;

    /// Flow key fields from the header bytes (clipped to what was captured).
    fn flow_key(&self, _header: &[u8]) -> KeyFields {
        KeyFields::new()
    }

    /// Record option or extension sub-headers of the header bytes.
    fn dissect_subheaders(&self, _header: &[u8], _sink: &mut SubHeaderSink<'_>) {}
}

/// Sub-header sink handed to dissection routines.
///
/// Offsets pushed are relative to the start of the parent header.
pub struct SubHeaderSink<'a> {
    arena: &'a mut RecordArena<SubHeaderRecord>,
    parent: ProtocolId,
    base: usize,
    start: usize,
    count: usize,
    exhausted: bool,
}

impl<'a> SubHeaderSink<'a> {
    pub(crate) fn new(
        arena: &'a mut RecordArena<SubHeaderRecord>,
        parent: ProtocolId,
        base: usize,
    ) -> Self {
        let start = arena.len();
        Self {
            arena,
            parent,
            base,
            start,
            count: 0,
            exhausted: false,
        }
    }

    /// Record one sub-header. Returns `false` once the arena is full.
    pub fn push(&mut self, code: u8, offset: usize, length: usize, flags: HeaderFlags) -> bool {
        if self.exhausted {
            return false;
        }
        let record = SubHeaderRecord::new(self.parent, code, self.base + offset, length, flags);
        match self.arena.push(record) {
            Some(_) => {
                self.count += 1;
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn finish(self) -> ArenaSpan {
        self.arena.span(self.start, self.count)
    }
}

/// Interpret up to eight big-endian bytes as an integer; longer values
/// (IPv6 addresses) are folded by xoring their 8-byte halves.
pub(crate) fn fold_be(bytes: &[u8]) -> u64 {
    bytes.chunks(8).fold(0u64, |acc, chunk| {
        let mut value = 0u64;
        for &b in chunk {
            value = (value << 8) | u64::from(b);
        }
        acc ^ value
    })
}
