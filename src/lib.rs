//! pktscan - Dissect the protocol header chain of captured packets.
//!
//! The binary reads one packet (hex on the command line or a raw byte file),
//! scans it with [`pktscan_core::Scanner`] and prints the header records.
//!
//! # Example
//!
//! ```no_run
//! use pktscan::cli::{parse_hex, OutputFormat, OutputFormatter};
//! use pktscan_core::{ProtocolId, Scanner};
//!
//! fn main() -> anyhow::Result<()> {
//!     let packet = parse_hex("ffffffffffff0011223344550806")?;
//!     let mut scanner = Scanner::default();
//!     let record = scanner.scan(&packet, ProtocolId::ETHERNET);
//!     let view = scanner.view(&record)?;
//!     OutputFormatter::new(OutputFormat::Table).write(&view, &mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod cli;
