//! Error types for pktscan-core.
//!
//! Scan-time conditions (truncation, arena exhaustion, unknown protocols,
//! handler failures) are reported through flags on the packet record and are
//! never errors. The types here cover API misuse:
//!
//! - [`enum@Error`] - Main error enum returned by scanner and registry calls
//! - [`RegistryError`] - Errors from protocol and heuristic registration
//! - [`HandlerError`] - Failure reported by an externally registered handler
//!
//! All errors implement `std::error::Error` and can be converted to `anyhow::Error`.

use thiserror::Error;

/// Main error type for pktscan-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error while registering a protocol or heuristic
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Scanner configuration rejected at construction time
    #[error("Invalid scanner configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Packet record refers to arena slots that have since been recycled
    #[error("Stale packet record: recorded in arena generation {record}, arena is at generation {arena}")]
    StaleRecord { record: u64, arena: u64 },

    /// Header index past the end of the packet's header list
    #[error("Header index {index} out of range (packet has {count} headers)")]
    HeaderIndex { index: usize, count: usize },

    /// Buffer passed for on-demand dissection does not cover the recorded header
    #[error("Buffer too short for recorded header: need {needed} bytes, have {have}")]
    BufferMismatch { needed: usize, have: usize },
}

/// Errors related to protocol registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Raw id is not below the id space limit
    #[error("Protocol id {id} out of range (ids must be below {max})")]
    IdOutOfRange { id: u8, max: usize },

    /// Id 0 is the terminal payload marker and cannot carry a routine
    #[error("Protocol id 0 is reserved for payload")]
    PayloadId,

    /// Heuristic names a candidate protocol with no scan routine
    #[error("No scan routine registered for protocol id {id}")]
    UnknownProtocol { id: u8 },
}

/// Failure reported by an external header scanner.
///
/// The driver treats it as "no match": the header is not recorded and the
/// chain terminates at the current offset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct HandlerError {
    reason: String,
}

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Result type alias using pktscan-core's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts() {
        let err: Error = RegistryError::PayloadId.into();
        assert!(matches!(err, Error::Registry(RegistryError::PayloadId)));
        assert_eq!(
            err.to_string(),
            "Registry error: Protocol id 0 is reserved for payload"
        );
    }

    #[test]
    fn test_handler_error_message() {
        let err = HandlerError::new("bad magic");
        assert_eq!(err.reason(), "bad magic");
        assert_eq!(err.to_string(), "bad magic");
    }

    #[test]
    fn test_stale_record_message() {
        let err = Error::StaleRecord {
            record: 3,
            arena: 4,
        };
        assert!(err.to_string().contains("generation 3"));
    }
}
