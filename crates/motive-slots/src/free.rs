//! Free-range index for the allocator.

use std::collections::{BTreeMap, BTreeSet};

use motive_core::{Dimension, SlotIndex};

use crate::allocator::IndexRange;

/// Maximal free ranges, indexed both by first index and by length.
///
/// Ranges never touch. First-fit consults the length index, so a lookup
/// costs one probe per distinct free length that is wide enough rather
/// than one per free range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FreeRanges {
    by_start: BTreeMap<SlotIndex, Dimension>,
    by_len: BTreeMap<Dimension, BTreeSet<SlotIndex>>,
}

impl FreeRanges {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of free ranges.
    pub(crate) fn len(&self) -> usize {
        self.by_start.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Free ranges, lowest address first.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = IndexRange> + '_ {
        self.by_start
            .iter()
            .map(|(&start, &len)| IndexRange::new(start, len))
    }

    pub(crate) fn first(&self) -> Option<IndexRange> {
        self.iter().next()
    }

    pub(crate) fn last(&self) -> Option<IndexRange> {
        self.iter().next_back()
    }

    pub(crate) fn clear(&mut self) {
        self.by_start.clear();
        self.by_len.clear();
    }

    /// Start of the lowest-addressed range holding at least `width`
    /// indices.
    pub(crate) fn first_fit(&self, width: Dimension) -> Option<SlotIndex> {
        self.by_len
            .range(width..)
            .filter_map(|(_, starts)| starts.first().copied())
            .min()
    }

    /// Drop the range beginning at `start`, returning its length.
    pub(crate) fn remove(&mut self, start: SlotIndex) -> Option<Dimension> {
        let len = self.by_start.remove(&start)?;
        if let Some(starts) = self.by_len.get_mut(&len) {
            starts.remove(&start);
            if starts.is_empty() {
                self.by_len.remove(&len);
            }
        }
        Some(len)
    }

    /// Add `[start, start + len)`, merging with touching ranges.
    pub(crate) fn release(&mut self, start: SlotIndex, len: Dimension) {
        let mut merged = IndexRange::new(start, len);
        let previous = self.by_start.range(..start).next_back();
        if let Some((&prev_start, &prev_len)) = previous {
            if prev_start + prev_len == start {
                self.remove(prev_start);
                merged = IndexRange::new(prev_start, prev_len + merged.len);
            }
        }
        if let Some(next_len) = self.remove(merged.end()) {
            merged.len += next_len;
        }
        self.insert(merged.start, merged.len);
    }

    /// Cut `[start, start + len)` out of the range that begins at `start`.
    pub(crate) fn take(&mut self, start: SlotIndex, len: Dimension) {
        let available = self.remove(start).unwrap_or(0);
        debug_assert!(
            available >= len,
            "free range at {start} holds {available} indices, {len} requested"
        );
        if available > len {
            self.insert(start + len, available - len);
        }
    }

    /// First range whose length-index entry is missing or stray.
    pub(crate) fn index_mismatch(&self) -> Option<SlotIndex> {
        for (&start, &len) in &self.by_start {
            if !self.by_len.get(&len).is_some_and(|s| s.contains(&start)) {
                return Some(start);
            }
        }
        let indexed: usize = self.by_len.values().map(BTreeSet::len).sum();
        if indexed == self.by_start.len() {
            return None;
        }
        self.by_len
            .iter()
            .flat_map(|(&len, starts)| starts.iter().map(move |&start| (start, len)))
            .find(|&(start, len)| self.by_start.get(&start) != Some(&len))
            .map(|(start, _)| start)
    }

    fn insert(&mut self, start: SlotIndex, len: Dimension) {
        self.by_start.insert(start, len);
        self.by_len.entry(len).or_default().insert(start);
    }
}

impl FromIterator<(SlotIndex, Dimension)> for FreeRanges {
    /// Collect ranges that are already maximal and disjoint.
    fn from_iter<I: IntoIterator<Item = (SlotIndex, Dimension)>>(iter: I) -> Self {
        let mut free = Self::new();
        for (start, len) in iter {
            free.insert(start, len);
        }
        free
    }
}
