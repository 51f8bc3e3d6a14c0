//! Records produced by a scan.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::arena::{ArenaSpan, RecordArena};
use crate::flags::{HeaderFlags, PacketFlags};
use crate::flow::FlowKey;
use crate::protocol::ProtocolId;

/// Opaque analysis state attached to a header by an external layer.
pub type Analysis = Arc<dyn Any + Send + Sync>;

/// Boundaries and state of one dissected header.
#[derive(Clone)]
pub struct HeaderRecord {
    id: ProtocolId,
    offset: usize,
    prefix: usize,
    length: usize,
    gap: usize,
    payload: usize,
    postfix: usize,
    flags: HeaderFlags,
    subheaders: ArenaSpan,
    analysis: Option<Analysis>,
}

impl HeaderRecord {
    pub(crate) fn new(id: ProtocolId, offset: usize, flags: HeaderFlags) -> Self {
        Self {
            id,
            offset,
            prefix: 0,
            length: 0,
            gap: 0,
            payload: 0,
            postfix: 0,
            flags,
            subheaders: ArenaSpan::default(),
            analysis: None,
        }
    }

    pub(crate) fn with_regions(
        mut self,
        prefix: usize,
        length: usize,
        gap: usize,
        payload: usize,
        postfix: usize,
    ) -> Self {
        self.prefix = prefix;
        self.length = length;
        self.gap = gap;
        self.payload = payload;
        self.postfix = postfix;
        self
    }

    #[inline]
    pub fn id(&self) -> ProtocolId {
        self.id
    }

    /// Absolute offset of the header proper (after any prefix).
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn prefix(&self) -> usize {
        self.prefix
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn gap(&self) -> usize {
        self.gap
    }

    #[inline]
    pub fn payload(&self) -> usize {
        self.payload
    }

    #[inline]
    pub fn postfix(&self) -> usize {
        self.postfix
    }

    #[inline]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.is_truncated()
    }

    pub fn prefix_offset(&self) -> usize {
        self.offset - self.prefix
    }

    pub fn payload_offset(&self) -> usize {
        self.offset + self.length + self.gap
    }

    pub fn postfix_offset(&self) -> usize {
        self.payload_offset() + self.payload
    }

    /// One past the last byte claimed by this header, postfix included.
    pub fn end_offset(&self) -> usize {
        self.postfix_offset() + self.postfix
    }

    #[inline]
    pub fn subheader_count(&self) -> usize {
        self.subheaders.len()
    }

    pub fn subheader_span(&self) -> ArenaSpan {
        self.subheaders
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub(crate) fn set_subheaders(&mut self, span: ArenaSpan) {
        self.subheaders = span;
        self.flags |= HeaderFlags::SUBHEADERS_DISSECTED;
    }

    pub(crate) fn set_analysis(&mut self, analysis: Analysis) {
        self.analysis = Some(analysis);
    }
}

impl fmt::Debug for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderRecord")
            .field("id", &self.id)
            .field("offset", &self.offset)
            .field("prefix", &self.prefix)
            .field("length", &self.length)
            .field("gap", &self.gap)
            .field("payload", &self.payload)
            .field("postfix", &self.postfix)
            .field("flags", &self.flags)
            .field("subheaders", &self.subheaders.len())
            .field("analysis", &self.analysis.is_some())
            .finish()
    }
}

/// An option or extension header inside a parent header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubHeaderRecord {
    parent: ProtocolId,
    code: u8,
    offset: usize,
    length: usize,
    flags: HeaderFlags,
}

impl SubHeaderRecord {
    pub(crate) fn new(
        parent: ProtocolId,
        code: u8,
        offset: usize,
        length: usize,
        flags: HeaderFlags,
    ) -> Self {
        Self {
            parent,
            code,
            offset,
            length,
            flags,
        }
    }

    #[inline]
    pub fn parent(&self) -> ProtocolId {
        self.parent
    }

    /// Option type or extension header number.
    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Absolute offset within the packet.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }
}

/// How the header chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd {
    /// No further header could be bound.
    Terminal,
    /// A header's fixed part ran past the captured data.
    Truncated,
}

/// Summary of one scanned packet.
///
/// The header list lives in the scanner's arena; read it through
/// [`Scanner::view`](crate::Scanner::view), which refuses the record once
/// the arena has been recycled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    pub(crate) frame_number: u64,
    pub(crate) flow_key: FlowKey,
    pub(crate) header_map: u64,
    pub(crate) headers: ArenaSpan,
    pub(crate) flags: PacketFlags,
    pub(crate) end: ScanEnd,
    pub(crate) wire_len: usize,
    pub(crate) captured_len: usize,
    pub(crate) payload_offset: usize,
    pub(crate) payload_len: usize,
}

impl PacketRecord {
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    #[inline]
    pub fn flow_key(&self) -> &FlowKey {
        &self.flow_key
    }

    /// Bit *i* is set iff a header with id *i* was recorded.
    #[inline]
    pub fn header_map(&self) -> u64 {
        self.header_map
    }

    #[inline]
    pub fn contains(&self, id: ProtocolId) -> bool {
        self.header_map & id.bit() != 0
    }

    #[inline]
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn header_span(&self) -> ArenaSpan {
        self.headers
    }

    #[inline]
    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    #[inline]
    pub fn end(&self) -> ScanEnd {
        self.end
    }

    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    #[inline]
    pub fn captured_len(&self) -> usize {
        self.captured_len
    }

    #[inline]
    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Key for per-flow state in analysis layers: flow hash and the bitmap
    /// of protocols that contributed to it.
    pub fn flow_id(&self) -> (u32, u64) {
        (self.flow_key.hash(), self.flow_key.header_map())
    }
}

/// Borrowed view over a packet record and its arena-resident headers.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'s> {
    record: &'s PacketRecord,
    headers: &'s [HeaderRecord],
    subheaders: &'s RecordArena<SubHeaderRecord>,
}

impl<'s> PacketView<'s> {
    pub(crate) fn new(
        record: &'s PacketRecord,
        headers: &'s [HeaderRecord],
        subheaders: &'s RecordArena<SubHeaderRecord>,
    ) -> Self {
        Self {
            record,
            headers,
            subheaders,
        }
    }

    pub fn record(&self) -> &'s PacketRecord {
        self.record
    }

    pub fn headers(&self) -> &'s [HeaderRecord] {
        self.headers
    }

    pub fn header_map(&self) -> u64 {
        self.record.header_map
    }

    pub fn flow_key(&self) -> &'s FlowKey {
        &self.record.flow_key
    }

    /// First header with `id`.
    pub fn header(&self, id: ProtocolId) -> Option<&'s HeaderRecord> {
        self.find_header(id, 0)
    }

    /// The `instance`-th header with `id` (tunnels repeat protocols).
    pub fn find_header(&self, id: ProtocolId, instance: usize) -> Option<&'s HeaderRecord> {
        if !self.record.contains(id) {
            return None;
        }
        self.headers.iter().filter(|h| h.id == id).nth(instance)
    }

    /// Sub-headers of `header`; empty if none were dissected.
    pub fn subheaders(&self, header: &HeaderRecord) -> &'s [SubHeaderRecord] {
        self.subheaders.get(header.subheaders).unwrap_or(&[])
    }

    /// Terminal payload bytes of `data`, the buffer the record was scanned from.
    pub fn payload<'d>(&self, data: &'d [u8]) -> &'d [u8] {
        let start = self.record.payload_offset;
        start
            .checked_add(self.record.payload_len)
            .and_then(|end| data.get(start..end))
            .unwrap_or(&[])
    }
}
