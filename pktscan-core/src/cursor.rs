//! Bounds-checked view of the packet handed to scan routines.

use crate::flags::HeaderFlags;
use crate::protocol::ProtocolId;

/// Position of the scan within one packet.
///
/// All offsets passed to the accessors are relative to [`offset`](Self::offset)
/// and every read is checked against the effective length: the smaller of
/// the remaining wire length and the captured length. A read that would
/// cross it returns `None`.
#[derive(Debug, Clone)]
pub struct ScanCursor<'a> {
    buf: &'a [u8],
    offset: usize,
    wire_len: usize,
    wire_end: usize,
    id: ProtocolId,
    flags: HeaderFlags,
}

impl<'a> ScanCursor<'a> {
    pub fn new(buf: &'a [u8], wire_len: usize, id: ProtocolId) -> Self {
        Self {
            buf,
            offset: 0,
            wire_len,
            wire_end: wire_len,
            id,
            flags: HeaderFlags::empty(),
        }
    }

    /// Absolute offset of the current header (its prefix, if any).
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Protocol being scanned.
    #[inline]
    pub fn id(&self) -> ProtocolId {
        self.id
    }

    /// Number of captured bytes.
    #[inline]
    pub fn memory_len(&self) -> usize {
        self.buf.len()
    }

    /// Original length of the packet on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    /// Logical end of the packet after trailers claimed by outer headers.
    #[inline]
    pub fn wire_end(&self) -> usize {
        self.wire_end
    }

    /// Absolute end of the readable region.
    #[inline]
    pub fn effective_len(&self) -> usize {
        self.wire_end.min(self.buf.len())
    }

    /// Readable bytes from the current offset.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.effective_len().saturating_sub(self.offset)
    }

    /// Bytes from the current offset to the logical end, readable or not.
    #[inline]
    pub fn wire_remaining(&self) -> usize {
        self.wire_end.saturating_sub(self.offset)
    }

    /// Cumulative flags inherited from earlier headers.
    #[inline]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    /// Whether `len` bytes at `rel` are readable.
    #[inline]
    pub fn is_accessible(&self, rel: usize, len: usize) -> bool {
        self.offset
            .checked_add(rel)
            .and_then(|start| start.checked_add(len))
            .is_some_and(|end| end <= self.effective_len())
    }

    /// Readable bytes from the current offset.
    #[inline]
    pub fn available(&self) -> &'a [u8] {
        let end = self.effective_len();
        self.buf.get(self.offset..end).unwrap_or(&[])
    }

    #[inline]
    pub fn bytes(&self, rel: usize, len: usize) -> Option<&'a [u8]> {
        if !self.is_accessible(rel, len) {
            return None;
        }
        let start = self.offset + rel;
        self.buf.get(start..start + len)
    }

    #[inline]
    pub fn u8_at(&self, rel: usize) -> Option<u8> {
        self.bytes(rel, 1).map(|b| b[0])
    }

    /// Big-endian `u16` at `rel`.
    #[inline]
    pub fn u16_at(&self, rel: usize) -> Option<u16> {
        self.bytes(rel, 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Big-endian `u32` at `rel`.
    #[inline]
    pub fn u32_at(&self, rel: usize) -> Option<u32> {
        self.bytes(rel, 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn set_id(&mut self, id: ProtocolId) {
        self.id = id;
    }

    pub(crate) fn advance_to(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Pull the logical end in; never extends it.
    pub(crate) fn shrink_wire_end(&mut self, end: usize) {
        self.wire_end = self.wire_end.min(end);
    }

    pub(crate) fn inherit(&mut self, flags: HeaderFlags) {
        self.flags |= flags.cumulative();
    }
}
