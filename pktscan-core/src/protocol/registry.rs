//! Dispatch registry: which routine scans each protocol id, and which
//! heuristics may bind a successor when static tables give none.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{
    ArpProtocol, EthernetProtocol, HeaderScan, HttpProtocol, IcmpProtocol, Ipv4Protocol,
    Ipv6Protocol, L2tpProtocol, LlcProtocol, PppProtocol, Protocol, ProtocolId, RtpProtocol,
    SipProtocol, SllProtocol, SnapProtocol, SubHeaderSink, TcpProtocol, UdpProtocol,
    VlanProtocol, MAX_ID_COUNT,
};
use crate::cursor::ScanCursor;
use crate::error::{HandlerError, RegistryError};
use crate::flow::KeyFields;

/// Scan routine supplied from outside the crate.
pub trait HeaderScanner: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Scan the header at the cursor. An error is treated as "no match".
    fn scan(&self, cursor: &ScanCursor<'_>) -> Result<HeaderScan, HandlerError>;

    /// Flow key fields from the header bytes.
    fn flow_key(&self, _header: &[u8]) -> KeyFields {
        KeyFields::new()
    }

    /// Record option or extension sub-headers of the header bytes.
    fn dissect_subheaders(&self, _header: &[u8], _sink: &mut SubHeaderSink<'_>) {}
}

/// Heuristic supplied from outside the crate.
pub trait HeuristicValidator: Send + Sync {
    /// Whether the bytes at the cursor look like the candidate protocol.
    fn validate(&self, cursor: &ScanCursor<'_>) -> bool;
}

/// Enum of all built-in scan routines.
///
/// Static dispatch for every built-in protocol; external routines go through
/// [`ScanRoutine::External`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Llc(LlcProtocol),
    Snap(SnapProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Vlan(VlanProtocol),
    L2tp(L2tpProtocol),
    Ppp(PppProtocol),
    Icmp(IcmpProtocol),
    Http(HttpProtocol),
    Arp(ArpProtocol),
    Sip(SipProtocol),
    Rtp(RtpProtocol),
    Sll(SllProtocol),
}

/// Macro to delegate Protocol trait methods to inner types.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Llc(p) => p.$method($($arg),*),
            BuiltinProtocol::Snap(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv6(p) => p.$method($($arg),*),
            BuiltinProtocol::Vlan(p) => p.$method($($arg),*),
            BuiltinProtocol::L2tp(p) => p.$method($($arg),*),
            BuiltinProtocol::Ppp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmp(p) => p.$method($($arg),*),
            BuiltinProtocol::Http(p) => p.$method($($arg),*),
            BuiltinProtocol::Arp(p) => p.$method($($arg),*),
            BuiltinProtocol::Sip(p) => p.$method($($arg),*),
            BuiltinProtocol::Rtp(p) => p.$method($($arg),*),
            BuiltinProtocol::Sll(p) => p.$method($($arg),*),
        }
    };
}

impl BuiltinProtocol {
    /// Every built-in routine in id order.
    pub const ALL: [BuiltinProtocol; 16] = [
        BuiltinProtocol::Ethernet(EthernetProtocol),
        BuiltinProtocol::Tcp(TcpProtocol),
        BuiltinProtocol::Udp(UdpProtocol),
        BuiltinProtocol::Llc(LlcProtocol),
        BuiltinProtocol::Snap(SnapProtocol),
        BuiltinProtocol::Ipv4(Ipv4Protocol),
        BuiltinProtocol::Ipv6(Ipv6Protocol),
        BuiltinProtocol::Vlan(VlanProtocol),
        BuiltinProtocol::L2tp(L2tpProtocol),
        BuiltinProtocol::Ppp(PppProtocol),
        BuiltinProtocol::Icmp(IcmpProtocol),
        BuiltinProtocol::Http(HttpProtocol),
        BuiltinProtocol::Arp(ArpProtocol),
        BuiltinProtocol::Sip(SipProtocol),
        BuiltinProtocol::Rtp(RtpProtocol),
        BuiltinProtocol::Sll(SllProtocol),
    ];

    /// Built-in routine registered under `id`, if any.
    pub fn from_id(id: ProtocolId) -> Option<Self> {
        let index = id.index().checked_sub(1)?;
        Self::ALL.get(index).copied()
    }
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn id(&self) -> ProtocolId {
        delegate_protocol!(self, id)
    }

    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_protocol!(self, display_name)
    }

    #[inline]
    fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        delegate_protocol!(self, scan, cursor)
    }

    #[inline]
    fn flow_key(&self, header: &[u8]) -> KeyFields {
        delegate_protocol!(self, flow_key, header)
    }

    #[inline]
    fn dissect_subheaders(&self, header: &[u8], sink: &mut SubHeaderSink<'_>) {
        delegate_protocol!(self, dissect_subheaders, header, sink)
    }
}

/// Conversion traits for ergonomic registration.
macro_rules! builtin_from {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        $(
            impl From<$ty> for BuiltinProtocol {
                fn from(p: $ty) -> Self {
                    BuiltinProtocol::$variant(p)
                }
            }
        )*
    };
}

builtin_from!(
    Ethernet(EthernetProtocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Llc(LlcProtocol),
    Snap(SnapProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Vlan(VlanProtocol),
    L2tp(L2tpProtocol),
    Ppp(PppProtocol),
    Icmp(IcmpProtocol),
    Http(HttpProtocol),
    Arp(ArpProtocol),
    Sip(SipProtocol),
    Rtp(RtpProtocol),
    Sll(SllProtocol),
);

/// Routine registered for one protocol id.
#[derive(Clone)]
pub enum ScanRoutine {
    Native(BuiltinProtocol),
    External(Arc<dyn HeaderScanner>),
}

impl ScanRoutine {
    pub fn name(&self) -> &str {
        match self {
            ScanRoutine::Native(p) => p.display_name(),
            ScanRoutine::External(s) => s.name(),
        }
    }

    /// Run the routine; `None` means no match.
    pub(crate) fn scan(&self, cursor: &ScanCursor<'_>) -> Option<HeaderScan> {
        match self {
            ScanRoutine::Native(p) => p.scan(cursor),
            ScanRoutine::External(s) => match s.scan(cursor) {
                Ok(scan) => Some(scan),
                Err(err) => {
                    debug!(
                        id = cursor.id().raw(),
                        offset = cursor.offset(),
                        handler = s.name(),
                        error = %err,
                        "external handler failed, treating as no match"
                    );
                    None
                }
            },
        }
    }

    pub(crate) fn flow_key(&self, header: &[u8]) -> KeyFields {
        match self {
            ScanRoutine::Native(p) => p.flow_key(header),
            ScanRoutine::External(s) => s.flow_key(header),
        }
    }

    pub(crate) fn dissect_subheaders(&self, header: &[u8], sink: &mut SubHeaderSink<'_>) {
        match self {
            ScanRoutine::Native(p) => p.dissect_subheaders(header, sink),
            ScanRoutine::External(s) => s.dissect_subheaders(header, sink),
        }
    }
}

impl fmt::Debug for ScanRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanRoutine::Native(p) => f.debug_tuple("Native").field(&p.name()).finish(),
            ScanRoutine::External(s) => f.debug_tuple("External").field(&s.name()).finish(),
        }
    }
}

/// Heuristic check for a candidate successor.
#[derive(Clone)]
pub enum Validator {
    Native(fn(&ScanCursor<'_>) -> bool),
    External(Arc<dyn HeuristicValidator>),
}

impl Validator {
    #[inline]
    pub fn validate(&self, cursor: &ScanCursor<'_>) -> bool {
        match self {
            Validator::Native(f) => f(cursor),
            Validator::External(v) => v.validate(cursor),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Native(_) => f.write_str("Validator::Native"),
            Validator::External(_) => f.write_str("Validator::External"),
        }
    }
}

#[derive(Debug, Clone)]
struct Heuristic {
    candidate: ProtocolId,
    validator: Validator,
}

/// Immutable, versioned dispatch table.
///
/// Modified only through [`SharedRegistry::publish`], which works on a copy;
/// scans keep the snapshot they started with.
#[derive(Debug, Clone)]
pub struct Registry {
    version: u64,
    routines: Vec<Option<ScanRoutine>>,
    heuristics: Vec<Vec<Heuristic>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Registry {
    /// Registry with no routines.
    pub fn empty() -> Self {
        Self {
            version: 0,
            routines: vec![None; MAX_ID_COUNT],
            heuristics: vec![Vec::new(); MAX_ID_COUNT],
        }
    }

    /// Registry with every built-in routine and heuristic.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for protocol in BuiltinProtocol::ALL {
            registry.register(protocol);
        }
        let heuristics: [(ProtocolId, ProtocolId, fn(&ScanCursor<'_>) -> bool); 3] = [
            (ProtocolId::TCP, ProtocolId::HTTP, HttpProtocol::validate),
            (ProtocolId::UDP, ProtocolId::SIP, SipProtocol::validate),
            (ProtocolId::UDP, ProtocolId::RTP, RtpProtocol::validate),
        ];
        for (parent, candidate, validate) in heuristics {
            registry.heuristics[parent.index()].push(Heuristic {
                candidate,
                validator: Validator::Native(validate),
            });
        }
        registry
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a built-in routine under its own id.
    pub fn register<P: Into<BuiltinProtocol>>(&mut self, protocol: P) {
        let protocol = protocol.into();
        self.routines[protocol.id().index()] = Some(ScanRoutine::Native(protocol));
    }

    /// Register an external routine, replacing whatever `id` had.
    pub fn register_external(
        &mut self,
        id: ProtocolId,
        scanner: Arc<dyn HeaderScanner>,
    ) -> Result<(), RegistryError> {
        if id.is_payload() {
            return Err(RegistryError::PayloadId);
        }
        self.routines[id.index()] = Some(ScanRoutine::External(scanner));
        Ok(())
    }

    /// Remove the routine for `id`.
    pub fn unregister(&mut self, id: ProtocolId) -> Option<ScanRoutine> {
        self.routines[id.index()].take()
    }

    /// Append a heuristic for `candidate` following `parent`. Heuristics for
    /// one parent are consulted in registration order.
    pub fn add_heuristic(
        &mut self,
        parent: ProtocolId,
        candidate: ProtocolId,
        validator: Validator,
    ) -> Result<(), RegistryError> {
        if parent.is_payload() || candidate.is_payload() {
            return Err(RegistryError::PayloadId);
        }
        if self.routine(candidate).is_none() {
            return Err(RegistryError::UnknownProtocol {
                id: candidate.raw(),
            });
        }
        self.heuristics[parent.index()].push(Heuristic {
            candidate,
            validator,
        });
        Ok(())
    }

    /// Drop every heuristic registered after `parent`.
    pub fn clear_heuristics(&mut self, parent: ProtocolId) {
        self.heuristics[parent.index()].clear();
    }

    #[inline]
    pub fn routine(&self, id: ProtocolId) -> Option<&ScanRoutine> {
        self.routines.get(id.index()).and_then(Option::as_ref)
    }

    pub fn name(&self, id: ProtocolId) -> Option<&str> {
        self.routine(id).map(ScanRoutine::name)
    }

    /// Candidates registered after `parent`, in consultation order.
    pub fn heuristics(&self, parent: ProtocolId) -> impl Iterator<Item = ProtocolId> + '_ {
        self.heuristics[parent.index()].iter().map(|h| h.candidate)
    }

    /// First candidate after `parent` whose validator accepts the cursor.
    pub fn run_heuristics(&self, parent: ProtocolId, cursor: &ScanCursor<'_>) -> Option<ProtocolId> {
        self.heuristics[parent.index()]
            .iter()
            .find(|h| self.routine(h.candidate).is_some() && h.validator.validate(cursor))
            .map(|h| h.candidate)
    }

    /// Registered routines in id order.
    pub fn registered(&self) -> impl Iterator<Item = (ProtocolId, &ScanRoutine)> {
        self.routines.iter().enumerate().filter_map(|(index, routine)| {
            let id = ProtocolId::new(index as u8)?;
            routine.as_ref().map(|r| (id, r))
        })
    }

    pub fn len(&self) -> usize {
        self.routines.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry handle shared between scanners.
///
/// Readers take a snapshot (`Arc<Registry>`) at scan start; writers clone the
/// current table, apply their change and swap in the new version.
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn builtin() -> Self {
        Self::new(Registry::builtin())
    }

    /// Current version of the table.
    pub fn snapshot(&self) -> Arc<Registry> {
        // The guarded value is a plain Arc swap, so a poisoned lock still
        // holds a consistent table.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Apply `update` to a copy of the current table and publish it.
    /// Returns the new version; on error nothing is published.
    pub fn publish<F>(&self, update: F) -> Result<u64, RegistryError>
    where
        F: FnOnce(&mut Registry) -> Result<(), RegistryError>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Registry::clone(&guard);
        update(&mut next)?;
        next.version = guard.version + 1;
        let version = next.version;
        *guard = Arc::new(next);
        debug!(version, "published registry");
        Ok(version)
    }

    /// Publish an external routine for `id`.
    pub fn register_external(
        &self,
        id: ProtocolId,
        scanner: Arc<dyn HeaderScanner>,
    ) -> Result<u64, RegistryError> {
        self.publish(|r| r.register_external(id, scanner))
    }

    /// Publish a heuristic for `candidate` following `parent`.
    pub fn add_heuristic(
        &self,
        parent: ProtocolId,
        candidate: ProtocolId,
        validator: Validator,
    ) -> Result<u64, RegistryError> {
        self.publish(|r| r.add_heuristic(parent, candidate, validator))
    }
}
