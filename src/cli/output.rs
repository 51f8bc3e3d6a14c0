//! Output formatting for scan results.
//!
//! One packet is rendered as its header chain: a row per header with the
//! region lengths and flags, optionally followed by the dissected
//! sub-headers, and a summary of the terminal payload and flow key.

use std::io::Write;

use clap::ValueEnum;
use pktscan_core::{HeaderFlags, HeaderRecord, PacketFlags, PacketView, ScanEnd};
use serde_json::json;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default)
    Table,
    /// Comma-separated values, one row per header
    Csv,
    /// JSON (one object per packet)
    Json,
}

const HEADER_COLUMNS: [&str; 10] = [
    "index",
    "protocol",
    "offset",
    "prefix",
    "length",
    "gap",
    "payload",
    "postfix",
    "flags",
    "subheaders",
];

/// Formats packet records for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a scanned packet and write to the given writer.
    pub fn write<W: Write>(&self, view: &PacketView<'_>, writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(view, writer),
            OutputFormat::Csv => self.write_csv(view, writer),
            OutputFormat::Json => self.write_json(view, writer),
        }
    }

    fn header_values(index: usize, header: &HeaderRecord) -> [String; 10] {
        [
            index.to_string(),
            header.id().to_string(),
            header.offset().to_string(),
            header.prefix().to_string(),
            header.length().to_string(),
            header.gap().to_string(),
            header.payload().to_string(),
            header.postfix().to_string(),
            header_flag_names(header.flags()).join("|"),
            header.subheader_count().to_string(),
        ]
    }

    fn write_table<W: Write>(&self, view: &PacketView<'_>, writer: &mut W) -> std::io::Result<()> {
        use comfy_table::{Cell, Table};

        let mut table = Table::new();
        table.set_header(HEADER_COLUMNS.iter().map(Cell::new));
        for (index, header) in view.headers().iter().enumerate() {
            table.add_row(Self::header_values(index, header).iter().map(Cell::new));
        }
        writeln!(writer, "{table}")?;

        let mut subtable = Table::new();
        subtable.set_header(["parent", "code", "offset", "length", "flags"].map(Cell::new));
        let mut any = false;
        for (index, header) in view.headers().iter().enumerate() {
            for sub in view.subheaders(header) {
                any = true;
                subtable.add_row([
                    Cell::new(format!("{index} ({})", sub.parent())),
                    Cell::new(sub.code()),
                    Cell::new(sub.offset()),
                    Cell::new(sub.length()),
                    Cell::new(header_flag_names(sub.flags()).join("|")),
                ]);
            }
        }
        if any {
            writeln!(writer, "{subtable}")?;
        }

        let record = view.record();
        let flags = packet_flag_names(record.flags());
        writeln!(
            writer,
            "end: {} | payload: {} bytes at {} | flow: {:#010x} (map {:#x}) | flags: {}",
            end_name(record.end()),
            record.payload_len(),
            record.payload_offset(),
            record.flow_key().hash(),
            record.flow_key().header_map(),
            if flags.is_empty() {
                "-".to_string()
            } else {
                flags.join("|")
            }
        )
    }

    fn write_csv<W: Write>(&self, view: &PacketView<'_>, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", HEADER_COLUMNS.join(","))?;
        for (index, header) in view.headers().iter().enumerate() {
            writeln!(writer, "{}", Self::header_values(index, header).join(","))?;
        }
        Ok(())
    }

    fn write_json<W: Write>(&self, view: &PacketView<'_>, writer: &mut W) -> std::io::Result<()> {
        let record = view.record();
        let headers: Vec<serde_json::Value> = view
            .headers()
            .iter()
            .map(|header| {
                let subheaders: Vec<serde_json::Value> = view
                    .subheaders(header)
                    .iter()
                    .map(|sub| {
                        json!({
                            "code": sub.code(),
                            "offset": sub.offset(),
                            "length": sub.length(),
                            "flags": header_flag_names(sub.flags()),
                        })
                    })
                    .collect();
                json!({
                    "protocol": header.id().to_string(),
                    "id": header.id().raw(),
                    "offset": header.offset(),
                    "prefix": header.prefix(),
                    "length": header.length(),
                    "gap": header.gap(),
                    "payload": header.payload(),
                    "postfix": header.postfix(),
                    "flags": header_flag_names(header.flags()),
                    "subheaders": subheaders,
                })
            })
            .collect();

        let packet = json!({
            "frame_number": record.frame_number(),
            "captured_len": record.captured_len(),
            "wire_len": record.wire_len(),
            "end": end_name(record.end()),
            "flags": packet_flag_names(record.flags()),
            "header_map": record.header_map(),
            "flow_hash": record.flow_key().hash(),
            "flow_reversible": record.flow_key().is_reversible(),
            "payload_offset": record.payload_offset(),
            "payload_len": record.payload_len(),
            "headers": headers,
        });
        writeln!(writer, "{packet}")
    }
}

fn end_name(end: ScanEnd) -> &'static str {
    match end {
        ScanEnd::Terminal => "terminal",
        ScanEnd::Truncated => "truncated",
    }
}

fn header_flag_names(flags: HeaderFlags) -> Vec<&'static str> {
    flags.iter_names().map(|(name, _)| name).collect()
}

fn packet_flag_names(flags: PacketFlags) -> Vec<&'static str> {
    flags.iter_names().map(|(name, _)| name).collect()
}
