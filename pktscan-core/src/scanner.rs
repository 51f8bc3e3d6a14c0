//! Scan driver.
//!
//! Walks the header chain of one packet, clipping each header against the
//! captured data, recording it into the header arena and folding its key
//! fields into the flow key.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::arena::{ArenaMode, RecordArena};
use crate::cursor::ScanCursor;
use crate::error::{Error, Result};
use crate::flags::{ConfigFlags, HeaderFlags, PacketFlags};
use crate::flow::FlowKey;
use crate::protocol::{
    HeaderScan, Next, ProtocolId, Registry, ScanRoutine, SharedRegistry, SubHeaderSink,
    MAX_ID_COUNT,
};
use crate::record::{Analysis, HeaderRecord, PacketRecord, PacketView, ScanEnd, SubHeaderRecord};

/// Default maximum number of headers recorded per packet.
pub const DEFAULT_MAX_HEADERS: usize = 32;

/// Default header arena capacity.
pub const DEFAULT_HEADER_CAPACITY: usize = 4096;

/// Default sub-header arena capacity.
pub const DEFAULT_SUBHEADER_CAPACITY: usize = 4096;

/// Scanner-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Maximum headers recorded for one packet.
    pub max_headers: usize,
    /// Header arena slots.
    pub header_capacity: usize,
    /// Sub-header arena slots.
    pub subheader_capacity: usize,
    pub arena_mode: ArenaMode,
    /// Dissect sub-headers of every header during the scan.
    pub dissect_subheaders: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_headers: DEFAULT_MAX_HEADERS,
            header_capacity: DEFAULT_HEADER_CAPACITY,
            subheader_capacity: DEFAULT_SUBHEADER_CAPACITY,
            arena_mode: ArenaMode::Ring,
            dissect_subheaders: false,
        }
    }
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_headers(mut self, value: usize) -> Self {
        self.max_headers = value;
        self
    }

    pub fn header_capacity(mut self, value: usize) -> Self {
        self.header_capacity = value;
        self
    }

    pub fn subheader_capacity(mut self, value: usize) -> Self {
        self.subheader_capacity = value;
        self
    }

    pub fn arena_mode(mut self, mode: ArenaMode) -> Self {
        self.arena_mode = mode;
        self
    }

    pub fn dissect_subheaders(mut self, enabled: bool) -> Self {
        self.dissect_subheaders = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_headers == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_headers must be at least 1".to_string(),
            });
        }
        if self.header_capacity == 0 {
            return Err(Error::InvalidConfig {
                reason: "header_capacity must be at least 1".to_string(),
            });
        }
        if self.arena_mode == ArenaMode::Ring && self.header_capacity < self.max_headers {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "header_capacity ({}) must hold max_headers ({}) in ring mode",
                    self.header_capacity, self.max_headers
                ),
            });
        }
        Ok(())
    }
}

/// Per-protocol overrides and binding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    flags: ConfigFlags,
    length: usize,
    next: ProtocolId,
}

impl Default for ProtocolConfig {
    /// Static binding first, heuristics when it finds no successor.
    fn default() -> Self {
        Self {
            flags: ConfigFlags::HEURISTIC_BINDING,
            length: 0,
            next: ProtocolId::PAYLOAD,
        }
    }
}

impl ProtocolConfig {
    /// Static binding only.
    pub fn static_only() -> Self {
        Self {
            flags: ConfigFlags::empty(),
            ..Self::default()
        }
    }

    /// Heuristics consulted before static binding.
    pub fn heuristic_first() -> Self {
        Self {
            flags: ConfigFlags::HEURISTIC_PRE_BINDING,
            ..Self::default()
        }
    }

    /// Force the header length.
    pub fn override_length(mut self, length: usize) -> Self {
        self.flags |= ConfigFlags::OVERRIDE_LENGTH;
        self.length = length;
        self
    }

    /// Force the next protocol, bypassing static and heuristic binding.
    pub fn override_binding(mut self, next: ProtocolId) -> Self {
        self.flags |= ConfigFlags::OVERRIDE_BINDING;
        self.next = next;
        self
    }

    #[inline]
    pub fn flags(&self) -> ConfigFlags {
        self.flags
    }

    fn length_override(&self) -> Option<usize> {
        self.flags
            .contains(ConfigFlags::OVERRIDE_LENGTH)
            .then_some(self.length)
    }

    fn binding_override(&self) -> Option<ProtocolId> {
        self.flags
            .contains(ConfigFlags::OVERRIDE_BINDING)
            .then_some(self.next)
    }
}

/// Header regions after clipping against the captured data.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    offset: usize,
    prefix: usize,
    length: usize,
    gap: usize,
    payload: usize,
    postfix: usize,
    /// Unclipped payload length; the logical end of the packet moves to
    /// `payload_start + expected_payload` for later headers.
    expected_payload: usize,
    fixed_clipped: bool,
    flags: HeaderFlags,
}

impl Geometry {
    fn payload_start(&self) -> usize {
        self.offset + self.length + self.gap
    }
}

/// Take up to `want` bytes at `*pos` without crossing `end`.
fn take(pos: &mut usize, end: usize, want: usize) -> (usize, bool) {
    let have = end.saturating_sub(*pos);
    let got = want.min(have);
    *pos += got;
    (got, got < want)
}

/// Clip the regions of `scan` in wire order against the cursor's readable end.
fn clip(cursor: &ScanCursor<'_>, scan: &HeaderScan, mut flags: HeaderFlags) -> Geometry {
    let end = cursor.effective_len();
    let mut pos = cursor.offset();

    let (prefix, prefix_clipped) = take(&mut pos, end, scan.prefix);
    let offset = pos;
    let (length, header_clipped) = if prefix_clipped {
        (0, true)
    } else {
        take(&mut pos, end, scan.length)
    };
    let (gap, gap_clipped) = if prefix_clipped || header_clipped {
        (0, false)
    } else {
        take(&mut pos, end, scan.gap)
    };
    if prefix_clipped {
        flags |= HeaderFlags::PREFIX_TRUNCATED;
    }
    if header_clipped {
        flags |= HeaderFlags::HEADER_TRUNCATED;
    }
    if gap_clipped {
        flags |= HeaderFlags::GAP_TRUNCATED;
    }
    let fixed_clipped = prefix_clipped || header_clipped || gap_clipped;

    let wire_left = cursor.wire_end().saturating_sub(pos);
    let (expected_payload, expected_postfix) = if flags.ignores_bounds() {
        (wire_left, 0)
    } else {
        match scan.payload {
            Some(declared) => (declared, wire_left.saturating_sub(declared)),
            None => {
                let postfix = scan.postfix.min(wire_left);
                (wire_left - postfix, postfix)
            }
        }
    };

    let (payload, postfix) = if fixed_clipped {
        (0, 0)
    } else {
        let (payload, payload_clipped) = take(&mut pos, end, expected_payload);
        if payload_clipped {
            flags |= HeaderFlags::PAYLOAD_TRUNCATED;
        }
        let (postfix, postfix_clipped) = take(&mut pos, end, expected_postfix);
        if postfix_clipped {
            flags |= HeaderFlags::POSTFIX_TRUNCATED;
        }
        (payload, postfix)
    };

    Geometry {
        offset,
        prefix,
        length,
        gap,
        payload,
        postfix,
        expected_payload,
        fixed_clipped,
        flags,
    }
}

/// Protocol chain scanner.
///
/// One scanner per capture session; scans are synchronous and reuse the
/// scanner's arenas. Scanners on different threads share only the registry.
#[derive(Debug)]
pub struct Scanner {
    registry: Arc<SharedRegistry>,
    config: ScannerConfig,
    protocols: [ProtocolConfig; MAX_ID_COUNT],
    headers: RecordArena<HeaderRecord>,
    subheaders: RecordArena<SubHeaderRecord>,
    frame_number: u64,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::with_parts(Arc::new(SharedRegistry::builtin()), ScannerConfig::default())
    }
}

impl Scanner {
    /// Create a scanner over `registry`; fails if `config` is unusable.
    pub fn new(registry: Arc<SharedRegistry>, config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parts(registry, config))
    }

    fn with_parts(registry: Arc<SharedRegistry>, config: ScannerConfig) -> Self {
        Self {
            headers: RecordArena::with_capacity(config.header_capacity),
            subheaders: RecordArena::with_capacity(config.subheader_capacity),
            registry,
            config,
            protocols: [ProtocolConfig::default(); MAX_ID_COUNT],
            frame_number: 0,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SharedRegistry> {
        &self.registry
    }

    pub fn protocol_config(&self, id: ProtocolId) -> &ProtocolConfig {
        &self.protocols[id.index()]
    }

    /// Replace the overrides and binding policy for `id`.
    pub fn configure(&mut self, id: ProtocolId, config: ProtocolConfig) {
        self.protocols[id.index()] = config;
    }

    pub fn header_arena(&self) -> &RecordArena<HeaderRecord> {
        &self.headers
    }

    pub fn subheader_arena(&self) -> &RecordArena<SubHeaderRecord> {
        &self.subheaders
    }

    /// Recycle both arenas. Records from earlier scans become stale.
    pub fn reset_arenas(&mut self) {
        self.headers.reset();
        self.subheaders.reset();
        trace!(generation = self.headers.generation(), "arenas recycled");
    }

    /// Scan `data`, captured in full, starting with protocol `first`.
    pub fn scan(&mut self, data: &[u8], first: ProtocolId) -> PacketRecord {
        self.scan_with_wire_len(data, data.len(), first)
    }

    /// Scan `data` whose original length on the wire was `wire_len`.
    pub fn scan_with_wire_len(
        &mut self,
        data: &[u8],
        wire_len: usize,
        first: ProtocolId,
    ) -> PacketRecord {
        let registry = self.registry.snapshot();
        self.frame_number += 1;
        if self.config.arena_mode == ArenaMode::Ring
            && self.headers.remaining() < self.config.max_headers
        {
            self.reset_arenas();
        }

        let mut cursor = ScanCursor::new(data, wire_len, first);
        let start = self.headers.len();
        let mut count = 0;
        let mut flags = PacketFlags::empty();
        let mut header_map = 0u64;
        let mut flow_key = FlowKey::new();
        let mut payload = (0, cursor.remaining());
        let mut heuristic = false;
        let mut id = first;

        let end = loop {
            if id.is_payload() {
                break ScanEnd::Terminal;
            }
            if count >= self.config.max_headers {
                flags |= PacketFlags::HEADER_LIMIT;
                break ScanEnd::Terminal;
            }
            if cursor.remaining() == 0 {
                break if cursor.wire_remaining() > 0 {
                    flags |= PacketFlags::TRUNCATED;
                    ScanEnd::Truncated
                } else {
                    ScanEnd::Terminal
                };
            }
            let Some(routine) = registry.routine(id) else {
                debug!(id = id.raw(), offset = cursor.offset(), "no scan routine for protocol");
                break ScanEnd::Terminal;
            };
            cursor.set_id(id);

            let config = self.protocols[id.index()];
            let Some(scan) = run_routine(routine, &cursor, &config) else {
                break ScanEnd::Terminal;
            };

            let mut header_flags = cursor.flags() | scan.flags;
            if heuristic {
                header_flags |= HeaderFlags::HEURISTIC_BINDING;
            }
            let geometry = clip(&cursor, &scan, header_flags);
            let record = HeaderRecord::new(id, geometry.offset, geometry.flags).with_regions(
                geometry.prefix,
                geometry.length,
                geometry.gap,
                geometry.payload,
                geometry.postfix,
            );
            let Some(slot) = self.headers.push(record) else {
                debug!(
                    id = id.raw(),
                    capacity = self.headers.capacity(),
                    "header arena exhausted"
                );
                flags |= PacketFlags::ARENA_EXHAUSTED;
                break ScanEnd::Terminal;
            };
            count += 1;
            header_map |= id.bit();
            trace!(
                id = id.raw(),
                offset = geometry.offset,
                length = geometry.length,
                payload = geometry.payload,
                flags = geometry.flags.bits(),
                "header"
            );

            let header_bytes = data
                .get(geometry.offset..geometry.offset + geometry.length)
                .unwrap_or(&[]);
            flow_key.accumulate(id, &routine.flow_key(header_bytes));
            if self.config.dissect_subheaders {
                self.dissect_slot(routine, slot, header_bytes);
            }

            cursor.inherit(geometry.flags);
            if geometry.flags.is_fragmented() {
                flags |= PacketFlags::FRAGMENTED;
            }
            if geometry.flags.is_truncated() {
                flags |= PacketFlags::TRUNCATED;
            }
            if geometry.fixed_clipped {
                payload = (geometry.payload_start(), 0);
                break ScanEnd::Truncated;
            }

            let payload_start = geometry.payload_start();
            if !geometry.flags.ignores_bounds() {
                cursor.shrink_wire_end(payload_start.saturating_add(geometry.expected_payload));
            }
            cursor.advance_to(payload_start);
            payload = (payload_start, geometry.payload);

            match resolve_next(&registry, &config, id, scan.next, &cursor) {
                Some((next, via_heuristic)) => {
                    id = next;
                    heuristic = via_heuristic;
                }
                None => break ScanEnd::Terminal,
            }
        };

        flow_key.finish();
        PacketRecord {
            frame_number: self.frame_number,
            flow_key,
            header_map,
            headers: self.headers.span(start, count),
            flags,
            end,
            wire_len,
            captured_len: data.len(),
            payload_offset: payload.0,
            payload_len: payload.1,
        }
    }

    /// Borrow the headers of `record`; fails if the arena was recycled since.
    pub fn view<'s>(&'s self, record: &'s PacketRecord) -> Result<PacketView<'s>> {
        let headers = self.headers.get(record.headers).ok_or(Error::StaleRecord {
            record: record.headers.generation(),
            arena: self.headers.generation(),
        })?;
        Ok(PacketView::new(record, headers, &self.subheaders))
    }

    /// Dissect sub-headers of header `index` of `record` on demand. `data` must
    /// be the buffer the record was scanned from. Returns the sub-header count.
    pub fn dissect_subheaders(
        &mut self,
        record: &PacketRecord,
        data: &[u8],
        index: usize,
    ) -> Result<usize> {
        let slot = self.header_slot(record, index)?;
        let (id, offset, length, flags, count) = {
            let header = self.headers.slot_mut(slot).ok_or(Error::HeaderIndex {
                index,
                count: record.header_count(),
            })?;
            (
                header.id(),
                header.offset(),
                header.length(),
                header.flags(),
                header.subheader_count(),
            )
        };
        if flags.contains(HeaderFlags::SUBHEADERS_DISSECTED) {
            return Ok(count);
        }
        let header_bytes = data.get(offset..offset + length).ok_or(Error::BufferMismatch {
            needed: offset + length,
            have: data.len(),
        })?;
        let registry = self.registry.snapshot();
        let Some(routine) = registry.routine(id) else {
            return Ok(0);
        };
        Ok(self.dissect_slot(routine, slot, header_bytes))
    }

    /// Attach external analysis state to header `index` of `record`.
    pub fn attach_analysis(
        &mut self,
        record: &PacketRecord,
        index: usize,
        analysis: Analysis,
    ) -> Result<()> {
        let slot = self.header_slot(record, index)?;
        if let Some(header) = self.headers.slot_mut(slot) {
            header.set_analysis(analysis);
        }
        Ok(())
    }

    fn header_slot(&self, record: &PacketRecord, index: usize) -> Result<usize> {
        if !self.headers.is_live(record.headers) {
            return Err(Error::StaleRecord {
                record: record.headers.generation(),
                arena: self.headers.generation(),
            });
        }
        if index >= record.header_count() {
            return Err(Error::HeaderIndex {
                index,
                count: record.header_count(),
            });
        }
        Ok(record.headers.start() + index)
    }

    fn dissect_slot(&mut self, routine: &ScanRoutine, slot: usize, header_bytes: &[u8]) -> usize {
        let Some(header) = self.headers.slot_mut(slot) else {
            return 0;
        };
        let mut sink = SubHeaderSink::new(&mut self.subheaders, header.id(), header.offset());
        routine.dissect_subheaders(header_bytes, &mut sink);
        if sink.is_exhausted() {
            debug!(id = header.id().raw(), "sub-header arena exhausted");
        }
        let span = sink.finish();
        header.set_subheaders(span);
        span.len()
    }
}

/// Invoke `routine` honouring the length and binding overrides.
fn run_routine(
    routine: &ScanRoutine,
    cursor: &ScanCursor<'_>,
    config: &ProtocolConfig,
) -> Option<HeaderScan> {
    match (config.length_override(), config.binding_override()) {
        (Some(length), Some(next)) => Some(HeaderScan::new(length, Next::from(next))),
        (length, next) => {
            let mut scan = routine.scan(cursor)?;
            if let Some(length) = length {
                scan.length = length;
            }
            if let Some(next) = next {
                scan.next = Next::from(next);
            }
            Some(scan)
        }
    }
}

/// Pick the next protocol after `parent`. The flag reports a heuristic binding.
fn resolve_next(
    registry: &Registry,
    config: &ProtocolConfig,
    parent: ProtocolId,
    next: Next,
    cursor: &ScanCursor<'_>,
) -> Option<(ProtocolId, bool)> {
    if let Some(forced) = config.binding_override() {
        return (!forced.is_payload()).then_some((forced, false));
    }
    if next == Next::EndOfHeaders {
        return None;
    }
    let flags = config.flags();
    if flags.contains(ConfigFlags::HEURISTIC_PRE_BINDING) {
        if let Some(id) = registry.run_heuristics(parent, cursor) {
            return Some((id, true));
        }
    }
    match next {
        Next::Protocol(id) => Some((id, false)),
        Next::Payload if flags.contains(ConfigFlags::HEURISTIC_BINDING) => registry
            .run_heuristics(parent, cursor)
            .map(|id| (id, true)),
        _ => None,
    }
}
