//! Fuzz target for the header chain scanner.
//!
//! Drives every link-layer start id over the same bytes, with the capture
//! both complete and cut short of the wire length, and checks that every
//! recorded region stays inside the captured data.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktscan_core::{ProtocolId, Scanner, ScannerConfig};

const START_IDS: [ProtocolId; 5] = [
    ProtocolId::ETHERNET,
    ProtocolId::SLL,
    ProtocolId::IPV4,
    ProtocolId::IPV6,
    ProtocolId::PPP,
];

fuzz_target!(|data: &[u8]| {
    let mut scanner = Scanner::new(
        std::sync::Arc::default(),
        ScannerConfig::new().dissect_subheaders(true),
    )
    .unwrap();

    for first in START_IDS {
        for wire_len in [data.len(), data.len() + 1500] {
            let record = scanner.scan_with_wire_len(data, wire_len, first);
            let view = scanner.view(&record).unwrap();
            for header in view.headers() {
                assert!(header.end_offset() <= data.len());
                for sub in view.subheaders(header) {
                    assert!(sub.offset() + sub.length() <= data.len());
                }
            }
            assert_eq!(
                record.header_map(),
                view.headers().iter().fold(0, |map, h| map | h.id().bit())
            );
        }
    }
});
