//! pktscan CLI entry point.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pktscan::cli::{Args, OutputFormatter};
use pktscan_core::{Registry, Scanner, ScannerConfig, SharedRegistry};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let registry = Arc::new(SharedRegistry::builtin());

    // Handle info-only commands
    if args.is_info_only() {
        list_protocols(&registry.snapshot());
        return Ok(());
    }

    let packet = args.packet_bytes()?;
    let wire_len = args.wire_len.unwrap_or(packet.len());

    let config = ScannerConfig::new()
        .max_headers(args.max_headers)
        .dissect_subheaders(args.subheaders);
    let mut scanner =
        Scanner::new(Arc::clone(&registry), config).context("Invalid scanner configuration")?;

    let first = args.link.first_protocol();
    info!(
        captured = packet.len(),
        wire_len,
        first = %first,
        "scanning packet"
    );
    let record = scanner.scan_with_wire_len(&packet, wire_len, first);
    let view = scanner.view(&record)?;
    info!(
        headers = record.header_count(),
        end = ?record.end(),
        "scan complete"
    );

    let formatter = OutputFormatter::new(args.format);
    let mut stdout = io::stdout();
    formatter
        .write(&view, &mut stdout)
        .context("Failed to write output")?;
    Ok(())
}

fn list_protocols(registry: &Registry) {
    println!("Registered Scan Routines (registry v{}):", registry.version());
    println!("{:-<50}", "");

    for (id, routine) in registry.registered() {
        println!("  {:>2}  {}", id.raw(), routine.name());

        let candidates: Vec<String> = registry
            .heuristics(id)
            .map(|candidate| candidate.to_string())
            .collect();
        if !candidates.is_empty() {
            println!("      -> Heuristics: {}", candidates.join(", "));
        }
    }
}
