//! Direction-independent flow key.
//!
//! Each recorded header may contribute key pairs (addresses, ports, protocol
//! selectors). A reversible pair swaps its two elements when the packet
//! travels the other way; a non-reversible pair is the same in both
//! directions. The key keeps the forward sequence and its reverse, and
//! hashes whichever of the two is lexicographically smaller, so both
//! directions of one conversation produce the same hash.

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::flags::FlowKeyFlags;
use crate::protocol::ProtocolId;

/// Maximum number of key pairs kept per packet.
pub const FLOW_KEY_PAIR_CAPACITY: usize = 6;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// One pair of key values contributed by a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPair {
    pub first: u64,
    pub second: u64,
    pub reversible: bool,
}

impl KeyPair {
    /// Source/destination style pair that swaps with direction.
    pub const fn reversible(first: u64, second: u64) -> Self {
        Self {
            first,
            second,
            reversible: true,
        }
    }

    /// Value that is the same in both directions.
    pub const fn symmetric(value: u64) -> Self {
        Self {
            first: value,
            second: value,
            reversible: false,
        }
    }

    /// The pair as seen from the opposite direction.
    pub const fn reversed(self) -> Self {
        if self.reversible {
            Self {
                first: self.second,
                second: self.first,
                reversible: true,
            }
        } else {
            self
        }
    }
}

/// Key pairs contributed by one header; two fit inline.
pub type KeyFields = SmallVec<[KeyPair; 2]>;

#[inline]
fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[inline]
fn hash_pair(hash: u32, id: ProtocolId, pair: KeyPair) -> u32 {
    let hash = fnv1a(hash, &[id.raw()]);
    let hash = fnv1a(hash, &pair.first.to_be_bytes());
    fnv1a(hash, &pair.second.to_be_bytes())
}

/// Flow key accumulated across the headers of one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowKey {
    header_map: u64,
    hash: u32,
    flags: FlowKeyFlags,
    pair_count: u8,
    ids: [ProtocolId; FLOW_KEY_PAIR_CAPACITY],
    forward: [[u64; 2]; FLOW_KEY_PAIR_CAPACITY],
    reverse: [[u64; 2]; FLOW_KEY_PAIR_CAPACITY],
    forward_hash: u32,
    reverse_hash: u32,
    orientation: Ordering,
}

impl Default for FlowKey {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowKey {
    pub const fn new() -> Self {
        Self {
            header_map: 0,
            hash: FNV_OFFSET,
            flags: FlowKeyFlags::empty(),
            pair_count: 0,
            ids: [ProtocolId::PAYLOAD; FLOW_KEY_PAIR_CAPACITY],
            forward: [[0; 2]; FLOW_KEY_PAIR_CAPACITY],
            reverse: [[0; 2]; FLOW_KEY_PAIR_CAPACITY],
            forward_hash: FNV_OFFSET,
            reverse_hash: FNV_OFFSET,
            orientation: Ordering::Equal,
        }
    }

    /// Append one pair contributed by `id`. Returns `false` when the key is
    /// already full and the pair was dropped.
    pub fn init(&mut self, id: ProtocolId, pair: KeyPair) -> bool {
        let slot = usize::from(self.pair_count);
        if slot >= FLOW_KEY_PAIR_CAPACITY {
            return false;
        }
        let reverse = pair.reversed();
        self.ids[slot] = id;
        self.forward[slot] = [pair.first, pair.second];
        self.reverse[slot] = [reverse.first, reverse.second];
        self.pair_count += 1;

        if pair.reversible {
            self.flags |= FlowKeyFlags::REVERSIBLE;
        }
        if self.orientation == Ordering::Equal {
            self.orientation = (pair.first, pair.second).cmp(&(reverse.first, reverse.second));
        }
        self.forward_hash = hash_pair(self.forward_hash, id, pair);
        self.reverse_hash = hash_pair(self.reverse_hash, id, reverse);
        true
    }

    /// Fold all pairs a header contributed into the key.
    pub fn accumulate(&mut self, id: ProtocolId, fields: &[KeyPair]) {
        if fields.is_empty() {
            return;
        }
        self.header_map |= id.bit();
        for &pair in fields {
            self.init(id, pair);
        }
    }

    /// Fix the hash to the canonical orientation.
    pub fn finish(&mut self) {
        self.hash = match self.orientation {
            Ordering::Greater => self.reverse_hash,
            _ => self.forward_hash,
        };
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Bitmap of the protocols that contributed pairs.
    #[inline]
    pub fn header_map(&self) -> u64 {
        self.header_map
    }

    #[inline]
    pub fn flags(&self) -> FlowKeyFlags {
        self.flags
    }

    #[inline]
    pub fn is_reversible(&self) -> bool {
        self.flags.contains(FlowKeyFlags::REVERSIBLE)
    }

    #[inline]
    pub fn pair_count(&self) -> usize {
        usize::from(self.pair_count)
    }

    pub fn ids(&self) -> &[ProtocolId] {
        &self.ids[..self.pair_count()]
    }

    pub fn forward_pairs(&self) -> &[[u64; 2]] {
        &self.forward[..self.pair_count()]
    }

    pub fn reverse_pairs(&self) -> &[[u64; 2]] {
        &self.reverse[..self.pair_count()]
    }

    /// Whether `other` describes the same conversation, in either direction.
    pub fn same_flow(&self, other: &FlowKey) -> bool {
        self.header_map == other.header_map
            && self.ids() == other.ids()
            && (self.forward_pairs() == other.forward_pairs()
                || self.forward_pairs() == other.reverse_pairs())
    }
}
