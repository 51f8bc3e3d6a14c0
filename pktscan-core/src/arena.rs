//! Fixed-capacity record arenas.
//!
//! Header and sub-header records live in arenas allocated once per scanner.
//! Slots are handed out by bumping a cursor; nothing is freed individually.
//! `reset()` recycles every slot at once and advances a generation counter so
//! that spans handed out before the reset are refused afterwards.
//!
//! # Invariants
//! - `len() <= capacity()` at all times; the backing storage never reallocates.
//! - A span is readable only while `span.generation == arena.generation()`.

/// When arena slots are recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArenaMode {
    /// The scanner recycles both arenas at scan start when the header arena
    /// cannot hold another `max_headers` records.
    #[default]
    Ring,
    /// The caller recycles explicitly with `Scanner::reset_arenas`.
    Manual,
}

/// A contiguous run of arena slots tagged with the generation it was
/// allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArenaSpan {
    generation: u64,
    start: usize,
    len: usize,
}

impl ArenaSpan {
    pub(crate) fn new(generation: u64, start: usize, len: usize) -> Self {
        Self {
            generation,
            start,
            len,
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump-allocated record storage with a fixed capacity.
#[derive(Debug)]
pub struct RecordArena<T> {
    slots: Vec<T>,
    capacity: usize,
    generation: u64,
}

impl<T> RecordArena<T> {
    /// Preallocate storage for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            generation: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.slots.len()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append a record, returning its slot index, or `None` when full.
    pub fn push(&mut self, record: T) -> Option<usize> {
        if self.slots.len() >= self.capacity {
            return None;
        }
        self.slots.push(record);
        Some(self.slots.len() - 1)
    }

    /// Recycle every slot and invalidate all outstanding spans.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Span covering `len` slots starting at `start` in the current generation.
    pub fn span(&self, start: usize, len: usize) -> ArenaSpan {
        ArenaSpan::new(self.generation, start, len)
    }

    /// Whether `span` was allocated in the current generation and is in bounds.
    pub fn is_live(&self, span: ArenaSpan) -> bool {
        span.generation == self.generation
            && span
                .start
                .checked_add(span.len)
                .is_some_and(|end| end <= self.slots.len())
    }

    /// Records covered by `span`, or `None` if the span is stale.
    pub fn get(&self, span: ArenaSpan) -> Option<&[T]> {
        if !self.is_live(span) {
            return None;
        }
        self.slots.get(span.start..span.start + span.len)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut arena = RecordArena::with_capacity(2);
        assert_eq!(arena.push(10u32), Some(0));
        assert_eq!(arena.push(11u32), Some(1));
        assert_eq!(arena.push(12u32), None);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn test_span_read() {
        let mut arena = RecordArena::with_capacity(8);
        arena.push(1u8);
        let start = arena.len();
        arena.push(2u8);
        arena.push(3u8);
        let span = arena.span(start, 2);
        assert_eq!(arena.get(span), Some(&[2u8, 3][..]));
    }

    #[test]
    fn test_reset_invalidates_spans() {
        let mut arena = RecordArena::with_capacity(4);
        arena.push(1u8);
        let span = arena.span(0, 1);
        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.generation(), 1);
        assert_eq!(arena.get(span), None);

        // Same slot index reused in the new generation is not reachable
        // through the old span either.
        arena.push(9u8);
        assert_eq!(arena.get(span), None);
        assert_eq!(arena.get(arena.span(0, 1)), Some(&[9u8][..]));
    }

    #[test]
    fn test_out_of_bounds_span() {
        let arena: RecordArena<u8> = RecordArena::with_capacity(4);
        assert_eq!(arena.get(arena.span(0, 1)), None);
        assert_eq!(arena.get(arena.span(usize::MAX, 2)), None);
        assert_eq!(arena.get(arena.span(0, 0)), Some(&[][..]));
    }
}
