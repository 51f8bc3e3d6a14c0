//! # pktscan-core
//!
//! Protocol-chain dissection engine.
//!
//! Given a captured packet, the scanner walks successive protocol headers
//! (Ethernet, IP, TCP, ...), records their boundaries and flags into
//! reusable arenas, and computes a direction-independent flow key. Truncated,
//! fragmented and malformed input never panics and never reads out of
//! bounds: every region a routine reports is clipped against the captured
//! data, and clipping is reported through flags.
//!
//! ## Quick Start
//!
//! ```rust
//! use pktscan_core::prelude::*;
//!
//! let mut scanner = Scanner::default();
//! let frame = [0u8; 60];
//! let record = scanner.scan(&frame, ProtocolId::ETHERNET);
//!
//! let view = scanner.view(&record).unwrap();
//! for header in view.headers() {
//!     println!("{} at {} ({} bytes)", header.id(), header.offset(), header.length());
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pktscan-core                                 |
//! +---------------------------------------------------------------------+
//! |  protocol/   - ProtocolId, scan routines, dispatch registry         |
//! |  cursor      - bounds-checked packet view for routines              |
//! |  scanner     - scan driver, per-protocol configuration              |
//! |  arena       - fixed-capacity record arenas with generations        |
//! |  record      - header, sub-header and packet records                |
//! |  flow        - direction-independent flow key                       |
//! |  flags       - header/packet/config flag sets                       |
//! |  error       - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Built-in Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet / 802.3, LLC, SNAP, 802.1Q VLAN, Linux SLL, PPP |
//! | Network | IPv4, IPv6 (extension headers), ARP, ICMP |
//! | Transport | TCP, UDP, L2TP |
//! | Application | HTTP, SIP, RTP (header boundaries only) |
//!
//! External routines and heuristics can be published at runtime through
//! [`SharedRegistry`]; running scans keep the registry version they started
//! with.

pub mod arena;
pub mod cursor;
pub mod error;
pub mod flags;
pub mod flow;
pub mod prelude;
pub mod protocol;
pub mod record;
pub mod scanner;

pub use arena::{ArenaMode, ArenaSpan, RecordArena};
pub use cursor::ScanCursor;
pub use error::{Error, HandlerError, RegistryError, Result};
pub use flags::{ConfigFlags, FlowKeyFlags, HeaderFlags, PacketFlags};
pub use flow::{FlowKey, KeyFields, KeyPair, FLOW_KEY_PAIR_CAPACITY};
pub use protocol::{
    BuiltinProtocol, HeaderScan, HeaderScanner, HeuristicValidator, Next, Protocol, ProtocolId,
    Registry, ScanRoutine, SharedRegistry, Validator, FIRST_CUSTOM_ID, MAX_ID_COUNT,
};
pub use record::{Analysis, HeaderRecord, PacketRecord, PacketView, ScanEnd, SubHeaderRecord};
pub use scanner::{ProtocolConfig, Scanner, ScannerConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
