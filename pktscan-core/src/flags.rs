//! Flag sets recorded by the scanner.
//!
//! Bit positions are part of the public contract: external layers read them
//! directly from header and packet records.

use bitflags::bitflags;

bitflags! {
    /// Per-header state (16 bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFlags: u16 {
        /// Prefix region extends past the captured data
        const PREFIX_TRUNCATED = 0x0001;

        /// Header proper extends past the captured data
        const HEADER_TRUNCATED = 0x0002;

        /// Payload shorter than the header declared (or than the wire length)
        const PAYLOAD_TRUNCATED = 0x0004;

        /// Gap between header and payload extends past the captured data
        const GAP_TRUNCATED = 0x0008;

        /// Postfix (trailer/padding) extends past the captured data
        const POSTFIX_TRUNCATED = 0x0010;

        /// Header was bound by a heuristic validator, not a static table
        const HEURISTIC_BINDING = 0x0020;

        /// A checksum layer verified this header
        const CRC_PERFORMED = 0x0040;

        /// A checksum layer found this header's checksum invalid
        const CRC_INVALID = 0x0080;

        /// Header belongs to a fragmented datagram (cumulative)
        const HEADER_FRAGMENTED = 0x0100;

        /// Sub-headers have been dissected into the sub-header arena
        const SUBHEADERS_DISSECTED = 0x0200;

        /// An external layer has decoded this header's fields
        const FIELDS_DISSECTED = 0x0400;

        /// Declared payload lengths are not enforced (cumulative)
        const IGNORE_BOUNDS = 0x0800;
    }
}

impl HeaderFlags {
    /// Flags inherited by every header after the one that set them.
    pub const CUMULATIVE: Self = Self::from_bits_retain(
        Self::HEADER_FRAGMENTED.bits() | Self::IGNORE_BOUNDS.bits(),
    );

    /// Any of the per-region truncation flags.
    pub const TRUNCATED: Self = Self::from_bits_retain(
        Self::PREFIX_TRUNCATED.bits()
            | Self::HEADER_TRUNCATED.bits()
            | Self::PAYLOAD_TRUNCATED.bits()
            | Self::GAP_TRUNCATED.bits()
            | Self::POSTFIX_TRUNCATED.bits(),
    );

    #[inline]
    pub fn cumulative(self) -> Self {
        self & Self::CUMULATIVE
    }

    #[inline]
    pub fn is_truncated(self) -> bool {
        self.intersects(Self::TRUNCATED)
    }

    #[inline]
    pub fn is_fragmented(self) -> bool {
        self.contains(Self::HEADER_FRAGMENTED)
    }

    #[inline]
    pub fn ignores_bounds(self) -> bool {
        self.contains(Self::IGNORE_BOUNDS)
    }
}

bitflags! {
    /// Per-packet summary flags (8 bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u8 {
        /// At least one header carries a truncation flag
        const TRUNCATED = 0b0000_0001;

        /// At least one header is part of a fragmented datagram
        const FRAGMENTED = 0b0000_0010;

        /// The header arena filled up and the header list is partial
        const ARENA_EXHAUSTED = 0b0000_0100;

        /// Dissection stopped at the configured header limit
        const HEADER_LIMIT = 0b0000_1000;
    }
}

bitflags! {
    /// Per-protocol scanner configuration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigFlags: u8 {
        /// Use the configured header length instead of the routine's
        const OVERRIDE_LENGTH = 0b0000_0001;

        /// Use the configured next protocol instead of binding resolution
        const OVERRIDE_BINDING = 0b0000_0010;

        /// Consult heuristics when static binding finds no successor
        const HEURISTIC_BINDING = 0b0000_0100;

        /// Consult heuristics before static binding
        const HEURISTIC_PRE_BINDING = 0b0000_1000;
    }
}

bitflags! {
    /// Flow key flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlowKeyFlags: u8 {
        /// At least one contributed pair is direction dependent
        const REVERSIBLE = 0b0000_0001;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_mask() {
        let flags = HeaderFlags::HEADER_FRAGMENTED
            | HeaderFlags::HEADER_TRUNCATED
            | HeaderFlags::HEURISTIC_BINDING;
        assert_eq!(flags.cumulative(), HeaderFlags::HEADER_FRAGMENTED);
        assert!(HeaderFlags::IGNORE_BOUNDS.cumulative().ignores_bounds());
    }

    #[test]
    fn test_truncated_mask() {
        assert!(!HeaderFlags::empty().is_truncated());
        assert!(HeaderFlags::POSTFIX_TRUNCATED.is_truncated());
        assert!(!(HeaderFlags::HEADER_FRAGMENTED | HeaderFlags::CRC_PERFORMED).is_truncated());
    }

    #[test]
    fn test_bit_positions_stable() {
        assert_eq!(HeaderFlags::HEADER_TRUNCATED.bits(), 0x0002);
        assert_eq!(HeaderFlags::IGNORE_BOUNDS.bits(), 0x0800);
        assert_eq!(PacketFlags::HEADER_LIMIT.bits(), 0x08);
        assert_eq!(ConfigFlags::HEURISTIC_PRE_BINDING.bits(), 0x08);
    }
}
