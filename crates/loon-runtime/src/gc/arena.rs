//! Two-space bump arena addressed by word index

use crate::value::Value;

/// The heap: one word vector holding both semispaces.
///
/// Addresses handed out by [`bump_allocate`](Arena::bump_allocate) are plain
/// indices into the vector. The cursor lives in the active half during
/// mutator execution; [`reset_cursor`](Arena::reset_cursor) moves it to the
/// inactive half for the copy phase and [`flip`](Arena::flip) then makes
/// that half the active one.
pub struct Arena {
    words: Vec<Value>,
    half: usize,
    front_active: bool,
    cursor: usize,
    // Base of the half the cursor occupies. Kept explicitly: an exactly
    // full front half leaves the cursor at `half`, which the magnitude
    // alone cannot tell apart from an empty back half.
    cursor_base: usize,
}

impl Arena {
    /// Create an arena with `half` words per semispace
    pub fn new(half: usize) -> Self {
        Self {
            words: vec![Value::NULL; half * 2],
            half,
            front_active: true,
            cursor: 0,
            cursor_base: 0,
        }
    }

    /// Words per semispace
    pub fn space_words(&self) -> usize {
        self.half
    }

    /// First word index of the active half
    pub fn active_base(&self) -> usize {
        if self.front_active {
            0
        } else {
            self.half
        }
    }

    /// First word index of the inactive half
    pub fn inactive_base(&self) -> usize {
        if self.front_active {
            self.half
        } else {
            0
        }
    }

    /// Words consumed in the half the cursor currently occupies
    pub fn used_words(&self) -> usize {
        self.cursor - self.cursor_base
    }

    /// Current bump cursor, as a word index
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True if an allocation of `words` cannot fit without collecting
    pub fn needs_collection(&self, words: usize) -> bool {
        self.used_words() + words > self.half
    }

    /// Reserve `words` contiguous slots, returning the base index
    pub fn bump_allocate(&mut self, words: usize) -> Option<usize> {
        if self.needs_collection(words) {
            return None;
        }
        let base = self.cursor;
        self.cursor += words;
        Some(base)
    }

    /// Move the cursor to the inactive half ahead of a copy phase
    pub(crate) fn reset_cursor(&mut self) {
        self.cursor_base = self.inactive_base();
        self.cursor = self.cursor_base;
    }

    /// Swap which half is active; the cursor is already inside it
    pub(crate) fn flip(&mut self) {
        self.front_active = !self.front_active;
    }

    /// Read one word
    pub fn word(&self, index: usize) -> Value {
        self.words[index]
    }

    /// Write one word
    pub fn set_word(&mut self, index: usize, value: Value) {
        self.words[index] = value;
    }

    /// Copy `count` words from `src` to `dst` (the ranges never overlap:
    /// copies always cross between halves)
    pub(crate) fn copy_words(&mut self, src: usize, dst: usize, count: usize) {
        self.words.copy_within(src..src + count, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_allocation_is_contiguous() {
        let mut arena = Arena::new(32);
        assert_eq!(arena.bump_allocate(4), Some(0));
        assert_eq!(arena.bump_allocate(2), Some(4));
        assert_eq!(arena.used_words(), 6);
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = Arena::new(8);
        assert_eq!(arena.bump_allocate(6), Some(0));
        assert!(arena.needs_collection(3));
        assert_eq!(arena.bump_allocate(3), None);
        assert_eq!(arena.bump_allocate(2), Some(6));
        assert_eq!(arena.bump_allocate(1), None);
    }

    #[test]
    fn test_exactly_full_half_does_not_spill() {
        let mut arena = Arena::new(8);
        assert_eq!(arena.bump_allocate(8), Some(0));
        // Cursor sits at the half boundary; the front half is full, not the
        // back half empty.
        assert_eq!(arena.used_words(), 8);
        assert!(arena.needs_collection(1));
        assert_eq!(arena.bump_allocate(1), None);

        // Same boundary on the destination side during a copy phase.
        arena.reset_cursor();
        assert_eq!(arena.bump_allocate(8), Some(8));
        assert_eq!(arena.bump_allocate(1), None);
        arena.flip();
        assert_eq!(arena.used_words(), 8);
    }

    #[test]
    fn test_flip_moves_allocation_to_other_half() {
        let mut arena = Arena::new(16);
        arena.bump_allocate(10);
        arena.reset_cursor();
        assert_eq!(arena.bump_allocate(2), Some(16));
        arena.flip();
        assert_eq!(arena.active_base(), 16);
        assert_eq!(arena.used_words(), 2);
        assert!(!arena.needs_collection(14));
        assert!(arena.needs_collection(15));
    }

    #[test]
    fn test_copy_words_between_halves() {
        let mut arena = Arena::new(8);
        arena.set_word(0, Value::number(1.0));
        arena.set_word(1, Value::TRUE);
        arena.copy_words(0, 8, 2);
        assert!(arena.word(8).equals(Value::number(1.0)));
        assert!(arena.word(9).equals(Value::TRUE));
    }
}
