//! Convenient re-exports for common usage.
//!
//! ```rust
//! use pktscan_core::prelude::*;
//!
//! let registry = std::sync::Arc::new(SharedRegistry::builtin());
//! let scanner = Scanner::new(registry, ScannerConfig::default()).unwrap();
//! assert_eq!(scanner.config().max_headers, 32);
//! ```

// Scanning
pub use crate::scanner::{ProtocolConfig, Scanner, ScannerConfig};

// Protocol types
pub use crate::protocol::{
    BuiltinProtocol, HeaderScan, HeaderScanner, HeuristicValidator, Next, ProtocolId, Registry,
    SharedRegistry, Validator,
};

// Records
pub use crate::flags::{HeaderFlags, PacketFlags};
pub use crate::flow::{FlowKey, KeyPair};
pub use crate::record::{HeaderRecord, PacketRecord, PacketView, ScanEnd};

// Error types
pub use crate::error::{Error, HandlerError, Result};
