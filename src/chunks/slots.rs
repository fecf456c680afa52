//! Slot accumulation buffer.
//!
//! Chunks append code fragments to named slots while a collection is being
//! generated. Fragments for the same slot are concatenated in contribution
//! order; slots keep the order in which they first received code.

use rustc_hash::FxHashMap;

/// Merged code of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCode {
    pub key: String,
    pub code: String,
}

/// Append-only named accumulation of generated code.
#[derive(Debug, Clone, Default)]
pub struct ChunkSlots {
    slots: Vec<SlotCode>,
    index: FxHashMap<String, usize>,
    fragment_count: usize,
    hash: String,
    next_binding: u32,
}

impl ChunkSlots {
    /// Creates an unstamped buffer. The program cache keys it by content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer stamped with the content hash of its producer.
    #[must_use]
    pub fn with_hash(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            ..Self::default()
        }
    }

    /// Appends `code` to `key`. No deduplication is performed.
    pub fn add(&mut self, key: &str, code: &str) {
        self.fragment_count += 1;
        if let Some(&idx) = self.index.get(key) {
            self.slots[idx].code.push_str(code);
            return;
        }
        self.index.insert(key.to_owned(), self.slots.len());
        self.slots.push(SlotCode {
            key: key.to_owned(),
            code: code.to_owned(),
        });
    }

    /// Merged code for `key`, if anything was contributed to it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&idx| self.slots[idx].code.as_str())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SlotCode> {
        self.slots.iter()
    }

    /// Number of distinct slots that received code.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of `add` calls, across all slots.
    #[inline]
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Content hash of the collection that produced these slots.
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn set_hash(&mut self, hash: impl Into<String>) {
        self.hash = hash.into();
    }

    /// Reserves `count` consecutive resource binding numbers and returns the
    /// first one.
    ///
    /// Bindings are handed out in generation order, which is fixed by the
    /// collection traversal, so the numbering is covered by the content hash.
    pub fn reserve_bindings(&mut self, count: u32) -> u32 {
        let base = self.next_binding;
        self.next_binding += count;
        base
    }

    /// Number of bindings reserved so far.
    #[inline]
    #[must_use]
    pub fn binding_count(&self) -> u32 {
        self.next_binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut slots = ChunkSlots::new();
        slots.add("x", "A");
        slots.add("y", "1");
        slots.add("x", "B");
        slots.add("x", "C");

        assert_eq!(slots.get("x"), Some("ABC"));
        assert_eq!(slots.get("y"), Some("1"));
        assert_eq!(slots.get("z"), None);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.fragment_count(), 4);

        let keys: Vec<_> = slots.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["x", "y"]);
    }

    #[test]
    fn test_no_deduplication() {
        let mut slots = ChunkSlots::new();
        slots.add("x", "A");
        slots.add("x", "A");
        assert_eq!(slots.get("x"), Some("AA"));
    }

    #[test]
    fn test_binding_reservation() {
        let mut slots = ChunkSlots::with_hash("h");
        assert_eq!(slots.reserve_bindings(2), 0);
        assert_eq!(slots.reserve_bindings(3), 2);
        assert_eq!(slots.reserve_bindings(0), 5);
        assert_eq!(slots.binding_count(), 5);
        assert_eq!(slots.hash(), "h");
    }
}
