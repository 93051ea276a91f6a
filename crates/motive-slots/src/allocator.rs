//! Variable-width index allocation with first-fit reuse and compaction.
//!
//! [`IndexAllocator`] hands out contiguous blocks of indices into a
//! processor's backing arrays. Every index in `[0, num_indices)` is in
//! exactly one state: the head of a used block, an interior cell of a used
//! block, or free. Free cells are kept as maximal ranges indexed by both
//! address and length, so that first-fit allocation only looks at ranges
//! wide enough for the request and a release merges with both neighbours.

use std::fmt;

use motive_core::{Dimension, SlotError, SlotIndex, VerifyError};
use tracing::{debug, trace, warn};

use crate::config::SlotConfig;
use crate::defrag::{self, DefragPlan, Relocation};
use crate::free::FreeRanges;

/// A contiguous run of indices `[start, start + len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First index of the run.
    pub start: SlotIndex,
    /// Number of indices in the run.
    pub len: Dimension,
}

impl IndexRange {
    /// Create a range from its first index and length.
    pub const fn new(start: SlotIndex, len: Dimension) -> Self {
        Self { start, len }
    }

    /// One past the last index.
    pub const fn end(&self) -> SlotIndex {
        self.start + self.len
    }

    /// Whether `index` lies inside the range.
    pub const fn contains(&self, index: SlotIndex) -> bool {
        index >= self.start && index < self.end()
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Storage-shaping notifications issued by the allocator.
///
/// The allocator never touches backing storage itself. The owner of the
/// storage implements this trait and is handed to every mutating call
/// that may need to reshape it.
pub trait AllocatorCallbacks {
    /// The total number of indices changed. Storage must be resized to
    /// exactly `num_indices` cells, preserving the cells below the smaller
    /// of the old and new sizes.
    fn set_num_indices(&mut self, num_indices: SlotIndex);

    /// The block `source` now lives at `target`.
    ///
    /// `target < source.start`, and `[target, target + source.len)` holds
    /// no other live block. The ranges may overlap when a block slides
    /// down by less than its own width, so copies must be overlap-safe.
    fn move_index_range(&mut self, source: IndexRange, target: SlotIndex);
}

/// Occupancy snapshot for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Length of the backing arrays.
    pub num_indices: SlotIndex,
    /// Indices inside used blocks.
    pub used_indices: SlotIndex,
    /// Indices available for allocation.
    pub free_indices: SlotIndex,
    /// Number of used blocks.
    pub blocks: usize,
    /// Number of maximal free ranges.
    pub free_ranges: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IndexState {
    Free,
    Head(Dimension),
    Interior,
}

/// Allocator of variable-width index blocks.
///
/// Allocation is first-fit over free ranges ordered by address, which
/// keeps used indices packed towards the front. When nothing fits, the
/// arrays grow at the tail (absorbing a trailing free range if there is
/// one). They only shrink in [`defragment`](Self::defragment).
#[derive(Clone, Debug)]
pub struct IndexAllocator {
    states: Vec<IndexState>,
    free: FreeRanges,
    used: SlotIndex,
    blocks: usize,
    max_indices: SlotIndex,
}

impl IndexAllocator {
    /// Create an empty allocator with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&SlotConfig::default())
    }

    /// Create an empty allocator with the given limits.
    ///
    /// The config is assumed to be validated.
    pub fn with_config(config: &SlotConfig) -> Self {
        Self {
            states: Vec::with_capacity(config.initial_capacity as usize),
            free: FreeRanges::new(),
            used: 0,
            blocks: 0,
            max_indices: config.max_indices,
        }
    }

    /// Total number of indices (the length of the backing arrays).
    pub fn num_indices(&self) -> SlotIndex {
        self.states.len() as SlotIndex
    }

    /// Upper bound on [`num_indices`](Self::num_indices).
    pub fn max_indices(&self) -> SlotIndex {
        self.max_indices
    }

    /// Number of indices inside used blocks.
    pub fn num_used_indices(&self) -> SlotIndex {
        self.used
    }

    /// Number of free indices below `num_indices`.
    pub fn num_free_indices(&self) -> SlotIndex {
        self.num_indices() - self.used
    }

    /// Number of used blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks
    }

    /// Whether no block is allocated.
    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    /// Allocate a block of `width` contiguous indices.
    ///
    /// Returns the first index of the block: the lowest free range that is
    /// wide enough, or the tail of the arrays after growing them through
    /// `callbacks.set_num_indices`.
    ///
    /// # Errors
    ///
    /// [`SlotError::CapacityExceeded`] if growing would pass
    /// `max_indices`. Nothing is modified in that case.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn allocate<C>(
        &mut self,
        width: Dimension,
        callbacks: &mut C,
    ) -> Result<SlotIndex, SlotError>
    where
        C: AllocatorCallbacks + ?Sized,
    {
        assert!(width > 0, "cannot allocate a zero-width block");

        let start = match self.free.first_fit(width) {
            Some(start) => {
                self.free.take(start, width);
                start
            }
            None => self.grow(width, callbacks)?,
        };
        self.mark_used(start, width);
        Ok(start)
    }

    /// Extend the arrays so that a block of `width` fits at the tail.
    fn grow<C>(&mut self, width: Dimension, callbacks: &mut C) -> Result<SlotIndex, SlotError>
    where
        C: AllocatorCallbacks + ?Sized,
    {
        let old_total = self.num_indices();
        let start = match self.free.last() {
            Some(last) if last.end() == old_total => last.start,
            _ => old_total,
        };
        let new_total = u64::from(start) + u64::from(width);
        if new_total > u64::from(self.max_indices) {
            warn!(
                requested = width,
                num_indices = old_total,
                max_indices = self.max_indices,
                "slot capacity exceeded"
            );
            return Err(SlotError::CapacityExceeded {
                requested: width,
                num_indices: old_total,
                max_indices: self.max_indices,
            });
        }
        let new_total = new_total as SlotIndex;
        self.free.remove(start);
        self.states.resize(new_total as usize, IndexState::Free);
        debug!(from = old_total, to = new_total, "growing slot storage");
        callbacks.set_num_indices(new_total);
        Ok(start)
    }

    /// Return the block `[index, index + width)` to the free pool.
    ///
    /// # Panics
    ///
    /// Panics unless `index` is the head of a used block of exactly
    /// `width` indices.
    pub fn release(&mut self, index: SlotIndex, width: Dimension) {
        let state = self.states.get(index as usize).copied();
        assert!(
            state == Some(IndexState::Head(width)),
            "release({index}, {width}): not the head of a block of that width (found {state:?})"
        );
        self.mark_states_free(IndexRange::new(index, width));
        self.used -= width;
        self.blocks -= 1;
        self.free.release(index, width);
    }

    /// Width of the block whose head is `index`, or 0 if `index` is not a
    /// used block head.
    pub fn count_for_index(&self, index: SlotIndex) -> Dimension {
        match self.states.get(index as usize) {
            Some(IndexState::Head(width)) => *width,
            _ => 0,
        }
    }

    /// Whether `index` is the first index of a used block.
    pub fn is_block_head(&self, index: SlotIndex) -> bool {
        matches!(self.states.get(index as usize), Some(IndexState::Head(_)))
    }

    /// Whether `index` lies anywhere inside a used block.
    pub fn is_used(&self, index: SlotIndex) -> bool {
        matches!(
            self.states.get(index as usize),
            Some(IndexState::Head(_) | IndexState::Interior)
        )
    }

    /// The used block that contains `index`, if any.
    pub fn block_containing(&self, index: SlotIndex) -> Option<IndexRange> {
        let mut head = index as usize;
        loop {
            match self.states.get(head)? {
                IndexState::Free => return None,
                IndexState::Head(width) => {
                    return Some(IndexRange::new(head as SlotIndex, *width));
                }
                IndexState::Interior => head = head.checked_sub(1)?,
            }
        }
    }

    /// Maximal free ranges, lowest address first.
    pub fn free_ranges(&self) -> impl Iterator<Item = IndexRange> + '_ {
        self.free.iter()
    }

    /// Used blocks, lowest address first.
    pub fn used_blocks(&self) -> impl Iterator<Item = IndexRange> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, state)| match state {
                IndexState::Head(width) => Some(IndexRange::new(i as SlotIndex, *width)),
                _ => None,
            })
    }

    /// Compute the compaction ledger without applying it.
    pub fn plan_defragment(&self) -> DefragPlan {
        let blocks = self
            .used_blocks()
            .map(|block| (block.start, block.len))
            .collect();
        defrag::plan(blocks, self.free.clone(), self.num_indices())
    }

    /// Pack every used block towards index 0 and shrink the arrays.
    ///
    /// Computes the full move ledger first, then applies it move by move,
    /// calling `callbacks.move_index_range` after each block's bookkeeping
    /// has been updated, and finally `callbacks.set_num_indices` if the
    /// tail became free. Returns the ledger that was applied. A second call
    /// with no allocation or release in between applies an empty ledger and
    /// issues no callbacks.
    pub fn defragment<C>(&mut self, callbacks: &mut C) -> DefragPlan
    where
        C: AllocatorCallbacks + ?Sized,
    {
        let plan = self.plan_defragment();
        for &Relocation { source, target } in plan.moves() {
            self.mark_states_free(source);
            self.free.release(source.start, source.len);
            self.free.take(target, source.len);
            self.mark_states_used(target, source.len);
            trace!(from = source.start, to = target, width = source.len, "relocating block");
            callbacks.move_index_range(source, target);
        }

        let new_total = plan.num_indices_after();
        if new_total < plan.num_indices_before() {
            self.free.remove(new_total);
            debug_assert!(
                self.free.is_empty(),
                "free ranges left below the new tail: {:?}",
                self.free
            );
            self.states.truncate(new_total as usize);
            callbacks.set_num_indices(new_total);
        }
        if !plan.is_empty() {
            debug!(
                moves = plan.moves().len(),
                from = plan.num_indices_before(),
                to = new_total,
                "defragmented slots"
            );
        }
        plan
    }

    /// Forget every block and free range without issuing callbacks.
    ///
    /// Used when the owning processor tears down its storage wholesale.
    pub fn clear(&mut self) {
        self.states.clear();
        self.free.clear();
        self.used = 0;
        self.blocks = 0;
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> SlotStats {
        SlotStats {
            num_indices: self.num_indices(),
            used_indices: self.used,
            free_indices: self.num_free_indices(),
            blocks: self.blocks,
            free_ranges: self.free.len(),
        }
    }

    /// Check the per-index states against the free ranges and counters.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let mut used = 0;
        let mut free_cells = 0;
        let mut interior_left: Dimension = 0;
        for (i, state) in self.states.iter().enumerate() {
            let index = i as SlotIndex;
            match *state {
                IndexState::Interior if interior_left > 0 => interior_left -= 1,
                _ if interior_left > 0 => return Err(VerifyError::BrokenBlock { index }),
                IndexState::Interior => return Err(VerifyError::BrokenBlock { index }),
                IndexState::Head(width) => {
                    used += width;
                    interior_left = width - 1;
                }
                IndexState::Free => free_cells += 1,
            }
        }
        if interior_left > 0 {
            return Err(VerifyError::BrokenBlock {
                index: self.num_indices(),
            });
        }

        let mut free = 0;
        let mut previous: Option<IndexRange> = None;
        for range in self.free_ranges() {
            let all_free = (range.start..range.end())
                .all(|i| self.states.get(i as usize) == Some(&IndexState::Free));
            if !all_free {
                return Err(VerifyError::FreeRangeMismatch { start: range.start });
            }
            if let Some(prev) = previous {
                if prev.end() == range.start {
                    return Err(VerifyError::UnmergedFreeRanges {
                        first: prev.start,
                        second: range.start,
                    });
                }
            }
            free += range.len;
            previous = Some(range);
        }
        if let Some(start) = self.free.index_mismatch() {
            return Err(VerifyError::FreeRangeMismatch { start });
        }

        let num_indices = self.num_indices();
        if used != self.used || free != free_cells || used + free != num_indices {
            return Err(VerifyError::Accounting {
                used,
                free,
                num_indices,
            });
        }
        Ok(())
    }

    fn mark_used(&mut self, start: SlotIndex, width: Dimension) {
        self.mark_states_used(start, width);
        self.used += width;
        self.blocks += 1;
    }

    fn mark_states_used(&mut self, start: SlotIndex, width: Dimension) {
        let start = start as usize;
        let end = start + width as usize;
        self.states[start] = IndexState::Head(width);
        self.states[start + 1..end].fill(IndexState::Interior);
    }

    fn mark_states_free(&mut self, range: IndexRange) {
        self.states[range.start as usize..range.end() as usize].fill(IndexState::Free);
    }
}

impl Default for IndexAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirrors storage as a tag per index so moves can be checked.
    #[derive(Default)]
    struct TagStorage {
        tags: Vec<Option<u32>>,
        resizes: Vec<SlotIndex>,
        moves: Vec<(IndexRange, SlotIndex)>,
    }

    impl TagStorage {
        fn tag(&mut self, start: SlotIndex, width: Dimension, tag: u32) {
            for i in start..start + width {
                self.tags[i as usize] = Some(tag);
            }
        }
    }

    impl AllocatorCallbacks for TagStorage {
        fn set_num_indices(&mut self, num_indices: SlotIndex) {
            self.tags.resize(num_indices as usize, None);
            self.resizes.push(num_indices);
        }

        fn move_index_range(&mut self, source: IndexRange, target: SlotIndex) {
            let s = source.start as usize;
            self.tags
                .copy_within(s..s + source.len as usize, target as usize);
            self.moves.push((source, target));
        }
    }

    fn alloc(a: &mut IndexAllocator, s: &mut TagStorage, width: Dimension) -> SlotIndex {
        a.allocate(width, s).unwrap()
    }

    #[test]
    fn allocations_are_dense_from_zero() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        assert_eq!(alloc(&mut a, &mut s, 2), 0);
        assert_eq!(alloc(&mut a, &mut s, 1), 2);
        assert_eq!(alloc(&mut a, &mut s, 3), 3);
        assert_eq!(a.num_indices(), 6);
        assert_eq!(s.resizes, vec![2, 3, 6]);
        assert_eq!(a.count_for_index(3), 3);
        assert_eq!(a.count_for_index(4), 0);
        assert!(a.verify().is_ok());
    }

    #[test]
    fn released_middle_index_is_reused_first_fit() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        for _ in 0..3 {
            alloc(&mut a, &mut s, 1);
        }
        a.release(1, 1);
        assert_eq!(alloc(&mut a, &mut s, 1), 1);
        assert_eq!(a.num_indices(), 3);
    }

    #[test]
    fn non_adjacent_holes_are_never_spliced() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        for _ in 0..4 {
            alloc(&mut a, &mut s, 1);
        }
        a.release(0, 1);
        a.release(2, 1);
        let index = alloc(&mut a, &mut s, 2);
        assert_eq!(index, 4);
        assert_eq!(a.num_indices(), 6);
        assert_eq!(a.free_ranges().count(), 2);
    }

    #[test]
    fn growth_absorbs_trailing_free_range() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 1);
        alloc(&mut a, &mut s, 1);
        a.release(1, 1);
        let index = alloc(&mut a, &mut s, 3);
        assert_eq!(index, 1);
        assert_eq!(a.num_indices(), 4);
        assert!(a.verify().is_ok());
    }

    #[test]
    fn release_merges_both_neighbours() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        for _ in 0..5 {
            alloc(&mut a, &mut s, 1);
        }
        a.release(1, 1);
        a.release(3, 1);
        assert_eq!(a.free_ranges().count(), 2);
        a.release(2, 1);
        let ranges: Vec<_> = a.free_ranges().collect();
        assert_eq!(ranges, vec![IndexRange::new(1, 3)]);
        assert!(a.verify().is_ok());
    }

    #[test]
    fn wide_request_splits_free_range() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 5);
        alloc(&mut a, &mut s, 1);
        a.release(0, 5);
        assert_eq!(alloc(&mut a, &mut s, 2), 0);
        let ranges: Vec<_> = a.free_ranges().collect();
        assert_eq!(ranges, vec![IndexRange::new(2, 3)]);
    }

    #[test]
    fn capacity_exceeded_leaves_state_unchanged() {
        let mut a = IndexAllocator::with_config(&SlotConfig::new(4));
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 3);
        let before = a.stats();
        let err = a.allocate(2, &mut s).unwrap_err();
        assert_eq!(
            err,
            SlotError::CapacityExceeded {
                requested: 2,
                num_indices: 3,
                max_indices: 4,
            }
        );
        assert_eq!(a.stats(), before);
        assert_eq!(s.resizes, vec![3]);
        assert_eq!(alloc(&mut a, &mut s, 1), 3);
    }

    #[test]
    #[should_panic(expected = "zero-width")]
    fn zero_width_panics() {
        let mut a = IndexAllocator::new();
        let _ = a.allocate(0, &mut TagStorage::default());
    }

    #[test]
    #[should_panic(expected = "not the head")]
    fn releasing_interior_index_panics() {
        let mut a = IndexAllocator::new();
        alloc(&mut a, &mut TagStorage::default(), 3);
        a.release(1, 2);
    }

    #[test]
    #[should_panic(expected = "not the head")]
    fn double_release_panics() {
        let mut a = IndexAllocator::new();
        alloc(&mut a, &mut TagStorage::default(), 1);
        a.release(0, 1);
        a.release(0, 1);
    }

    #[test]
    fn block_containing_walks_to_head() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 1);
        alloc(&mut a, &mut s, 4);
        assert_eq!(a.block_containing(3), Some(IndexRange::new(1, 4)));
        assert_eq!(a.block_containing(0), Some(IndexRange::new(0, 1)));
        assert_eq!(a.block_containing(9), None);
        assert!(a.is_used(4));
        assert!(!a.is_block_head(4));
    }

    #[test]
    fn defragment_moves_tail_block_into_hole() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        let ia = alloc(&mut a, &mut s, 2);
        let ib = alloc(&mut a, &mut s, 1);
        let ic = alloc(&mut a, &mut s, 2);
        assert_eq!((ia, ib, ic), (0, 2, 3));
        s.tag(ib, 1, 11);
        s.tag(ic, 2, 22);

        a.release(ia, 2);
        let plan = a.defragment(&mut s);

        assert_eq!(
            plan.moves(),
            &[Relocation {
                source: IndexRange::new(3, 2),
                target: 0
            }]
        );
        assert_eq!(a.num_indices(), 3);
        assert_eq!(s.resizes.last(), Some(&3));
        assert_eq!(s.tags, vec![Some(22), Some(22), Some(11)]);
        assert_eq!(a.free_ranges().count(), 0);
        assert!(a.verify().is_ok());
    }

    #[test]
    fn defragment_slides_wide_block_over_narrow_hole() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 1);
        let wide = alloc(&mut a, &mut s, 3);
        s.tag(wide, 3, 7);
        a.release(0, 1);

        let plan = a.defragment(&mut s);
        assert_eq!(plan.moves().len(), 1);
        assert_eq!(plan.moves()[0].target, 0);
        assert_eq!(a.num_indices(), 3);
        assert_eq!(a.count_for_index(0), 3);
        assert_eq!(s.tags, vec![Some(7); 3]);
        assert!(a.verify().is_ok());
    }

    #[test]
    fn defragment_twice_is_idempotent() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        for w in [1, 2, 3, 1, 2] {
            alloc(&mut a, &mut s, w);
        }
        a.release(1, 2);
        a.release(6, 1);
        let _ = a.defragment(&mut s);
        let moves = s.moves.len();
        let resizes = s.resizes.len();

        let second = a.defragment(&mut s);
        assert!(second.is_empty());
        assert_eq!(s.moves.len(), moves);
        assert_eq!(s.resizes.len(), resizes);
    }

    #[test]
    fn defragment_with_only_trailing_space_just_shrinks() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 2);
        alloc(&mut a, &mut s, 2);
        a.release(2, 2);
        let plan = a.defragment(&mut s);
        assert!(plan.moves().is_empty());
        assert_eq!(plan.num_indices_after(), 2);
        assert_eq!(a.num_indices(), 2);
    }

    #[test]
    fn defragment_of_empty_allocator_drops_everything() {
        let mut a = IndexAllocator::new();
        let mut s = TagStorage::default();
        alloc(&mut a, &mut s, 4);
        a.release(0, 4);
        let _ = a.defragment(&mut s);
        assert_eq!(a.num_indices(), 0);
        assert!(a.is_empty());
        assert_eq!(s.resizes.last(), Some(&0));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Alloc(Dimension),
            Release(usize),
            Defrag,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (1u32..5).prop_map(Op::Alloc),
                3 => any::<usize>().prop_map(Op::Release),
                1 => Just(Op::Defrag),
            ]
        }

        proptest! {
            #[test]
            fn free_plus_used_equals_num_indices(ops in proptest::collection::vec(op(), 1..80)) {
                let mut a = IndexAllocator::new();
                let mut s = TagStorage::default();
                let mut live: Vec<u32> = Vec::new();
                let mut next_tag = 0u32;
                for op in ops {
                    match op {
                        Op::Alloc(width) => {
                            let index = a.allocate(width, &mut s).unwrap();
                            s.tag(index, width, next_tag);
                            live.push(next_tag);
                            next_tag += 1;
                        }
                        Op::Release(pick) if !live.is_empty() => {
                            let tag = live.swap_remove(pick % live.len());
                            let block = a
                                .used_blocks()
                                .find(|b| s.tags[b.start as usize] == Some(tag))
                                .unwrap();
                            a.release(block.start, block.len);
                            for i in block.start..block.end() {
                                s.tags[i as usize] = None;
                            }
                        }
                        Op::Release(_) => {}
                        Op::Defrag => {
                            let _ = a.defragment(&mut s);
                        }
                    }
                    let free: u32 = a.free_ranges().map(|r| r.len).sum();
                    let used: u32 = a.used_blocks().map(|b| b.len).sum();
                    prop_assert_eq!(free + used, a.num_indices());
                    prop_assert!(a.verify().is_ok());
                    prop_assert_eq!(a.num_blocks(), live.len());
                }
            }

            #[test]
            fn defragment_packs_and_preserves_contents(
                widths in proptest::collection::vec(1u32..5, 1..30),
                releases in proptest::collection::vec(any::<bool>(), 30),
            ) {
                let mut a = IndexAllocator::new();
                let mut s = TagStorage::default();
                let mut kept = Vec::new();
                let mut blocks = Vec::new();
                for (tag, &width) in widths.iter().enumerate() {
                    let index = a.allocate(width, &mut s).unwrap();
                    s.tag(index, width, tag as u32);
                    blocks.push((index, width, tag as u32));
                }
                for (i, &(index, width, tag)) in blocks.iter().enumerate() {
                    if releases[i] {
                        a.release(index, width);
                        for j in index..index + width {
                            s.tags[j as usize] = None;
                        }
                    } else {
                        kept.push((width, tag));
                    }
                }

                let _ = a.defragment(&mut s);

                let used: u32 = kept.iter().map(|&(w, _)| w).sum();
                prop_assert_eq!(a.num_indices(), used);
                prop_assert_eq!(a.free_ranges().count(), 0);
                for (width, tag) in kept {
                    let block = a
                        .used_blocks()
                        .find(|b| s.tags[b.start as usize] == Some(tag))
                        .unwrap();
                    prop_assert_eq!(block.len, width);
                    for i in block.start..block.end() {
                        prop_assert_eq!(s.tags[i as usize], Some(tag));
                    }
                }
                prop_assert!(a.defragment(&mut s).is_empty());
            }
        }
    }
}
