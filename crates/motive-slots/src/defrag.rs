//! Compaction ledger.
//!
//! Defragmentation is two-phase. [`plan`] runs on a private copy of the
//! allocator layout and produces a [`DefragPlan`]: the ordered list of
//! block moves plus the final number of indices. Nothing observable
//! changes during planning. The allocator then replays the ledger against
//! its own state, notifying storage after each move.
//!
//! # Move selection
//!
//! While a hole (free range) remains below the tail:
//!
//! 1. A free range that reaches the tail is dropped; the tail shrinks.
//! 2. Otherwise take the lowest hole and pick a used block above it that
//!    fits inside it. Two pickers are run and the ledger with fewer moves
//!    wins, the widest-first one on a tie:
//!    - widest first: the widest fitting block, preferring the highest
//!      address on a tie so the tail empties first;
//!    - tail first: the highest-addressed fitting block.
//! 3. If no block above fits, slide the block directly after the hole down
//!    to the hole's start. The block is wider than the hole, so the source
//!    and destination overlap.
//!
//! Every move lowers a block's address, so the loop terminates with every
//! used block packed into `[0, num_indices_after)`. Both pickers pack to
//! the same final length.

use std::collections::BTreeMap;

use motive_core::{Dimension, SlotIndex};
use smallvec::SmallVec;

use crate::allocator::IndexRange;
use crate::free::FreeRanges;

/// One block move: `source` is copied to start at `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// The block's range before the move.
    pub source: IndexRange,
    /// The block's first index after the move.
    pub target: SlotIndex,
}

/// The ordered move ledger of one compaction pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct DefragPlan {
    moves: SmallVec<[Relocation; 8]>,
    num_indices_before: SlotIndex,
    num_indices_after: SlotIndex,
}

impl DefragPlan {
    /// Moves in application order.
    pub fn moves(&self) -> &[Relocation] {
        &self.moves
    }

    /// `num_indices` when the plan was computed.
    pub fn num_indices_before(&self) -> SlotIndex {
        self.num_indices_before
    }

    /// `num_indices` once the plan has been applied.
    pub fn num_indices_after(&self) -> SlotIndex {
        self.num_indices_after
    }

    /// Whether applying the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.num_indices_after == self.num_indices_before
    }
}

/// How a hole picks the block that fills it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Picker {
    WidestFirst,
    TailFirst,
}

/// Compute the ledger for the given layout.
///
/// `blocks` maps each used block head to its width; `free` holds the
/// maximal free ranges.
pub(crate) fn plan(
    blocks: BTreeMap<SlotIndex, Dimension>,
    free: FreeRanges,
    num_indices: SlotIndex,
) -> DefragPlan {
    let widest = plan_with(Picker::WidestFirst, blocks.clone(), free.clone(), num_indices);
    if widest.moves.len() <= 1 {
        return widest;
    }
    let tail = plan_with(Picker::TailFirst, blocks, free, num_indices);
    if tail.moves.len() < widest.moves.len() {
        tail
    } else {
        widest
    }
}

fn plan_with(
    picker: Picker,
    mut blocks: BTreeMap<SlotIndex, Dimension>,
    mut free: FreeRanges,
    num_indices: SlotIndex,
) -> DefragPlan {
    let mut total = num_indices;
    let mut moves = SmallVec::new();

    loop {
        if let Some(last) = free.last() {
            if last.end() == total {
                free.remove(last.start);
                total = last.start;
                continue;
            }
        }
        let Some(hole) = free.first() else {
            break;
        };
        let mut above = blocks.range(hole.end()..);
        let fitting = match picker {
            Picker::WidestFirst => above
                .clone()
                .filter(|&(_, &width)| width <= hole.len)
                .max_by_key(|&(&start, &width)| (width, start)),
            Picker::TailFirst => above
                .clone()
                .rev()
                .find(|&(_, &width)| width <= hole.len),
        };
        // A hole that is not at the tail always has a block above it.
        let Some(source) = fitting
            .or_else(|| above.next())
            .map(|(&start, &width)| IndexRange::new(start, width))
        else {
            break;
        };

        blocks.remove(&source.start);
        blocks.insert(hole.start, source.len);
        free.release(source.start, source.len);
        free.take(hole.start, source.len);
        moves.push(Relocation {
            source,
            target: hole.start,
        });
    }

    DefragPlan {
        moves,
        num_indices_before: num_indices,
        num_indices_after: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(blocks: &[(SlotIndex, Dimension)], free: &[(SlotIndex, Dimension)]) -> DefragPlan {
        let total = blocks
            .iter()
            .chain(free.iter())
            .map(|&(s, w)| s + w)
            .max()
            .unwrap_or(0);
        plan(
            blocks.iter().copied().collect(),
            free.iter().copied().collect(),
            total,
        )
    }

    #[test]
    fn packed_layout_needs_no_moves() {
        let p = layout(&[(0, 2), (2, 1), (3, 3)], &[]);
        assert!(p.is_empty());
        assert_eq!(p.num_indices_after(), 6);
    }

    #[test]
    fn trailing_hole_only_shrinks() {
        let p = layout(&[(0, 2)], &[(2, 5)]);
        assert!(p.moves().is_empty());
        assert_eq!(p.num_indices_after(), 2);
        assert!(!p.is_empty());
    }

    #[test]
    fn widest_fitting_block_is_chosen() {
        // Hole of 2 at the front; blocks of width 1 and 2 above it.
        let p = layout(&[(2, 1), (3, 2)], &[(0, 2)]);
        assert_eq!(
            p.moves(),
            &[Relocation {
                source: IndexRange::new(3, 2),
                target: 0
            }]
        );
        assert_eq!(p.num_indices_after(), 3);
    }

    #[test]
    fn ties_prefer_highest_address() {
        let p = layout(&[(1, 1), (2, 1), (3, 1)], &[(0, 1)]);
        assert_eq!(p.moves()[0].source, IndexRange::new(3, 1));
        assert_eq!(p.moves().len(), 1);
        assert_eq!(p.num_indices_after(), 3);
    }

    #[test]
    fn too_wide_blocks_slide_down() {
        let p = layout(&[(1, 3), (4, 3)], &[(0, 1)]);
        assert_eq!(
            p.moves(),
            &[
                Relocation {
                    source: IndexRange::new(1, 3),
                    target: 0
                },
                Relocation {
                    source: IndexRange::new(4, 3),
                    target: 3
                },
            ]
        );
        assert_eq!(p.num_indices_after(), 6);
    }

    #[test]
    fn tail_first_wins_when_it_needs_fewer_moves() {
        let p = layout(&[(2, 2), (4, 1), (5, 1)], &[(0, 2)]);
        assert_eq!(
            p.moves(),
            &[
                Relocation {
                    source: IndexRange::new(5, 1),
                    target: 0
                },
                Relocation {
                    source: IndexRange::new(4, 1),
                    target: 1
                },
            ]
        );
        assert_eq!(p.num_indices_after(), 4);
    }

    #[test]
    fn widest_first_wins_when_it_needs_fewer_moves() {
        let p = layout(&[(3, 1), (4, 3), (7, 1)], &[(0, 3)]);
        assert_eq!(
            p.moves(),
            &[
                Relocation {
                    source: IndexRange::new(4, 3),
                    target: 0
                },
                Relocation {
                    source: IndexRange::new(7, 1),
                    target: 4
                },
            ]
        );
        assert_eq!(p.num_indices_after(), 5);
    }

    #[test]
    fn both_pickers_pack_to_the_same_length() {
        let blocks: BTreeMap<SlotIndex, Dimension> =
            [(1, 2), (4, 1), (6, 3), (10, 1), (12, 2)].into_iter().collect();
        let free: FreeRanges = [(0, 1), (3, 1), (5, 1), (9, 1), (11, 1)]
            .into_iter()
            .collect();
        let widest = plan_with(Picker::WidestFirst, blocks.clone(), free.clone(), 14);
        let tail = plan_with(Picker::TailFirst, blocks.clone(), free.clone(), 14);
        assert_eq!(widest.num_indices_after(), 9);
        assert_eq!(tail.num_indices_after(), 9);
        let chosen = plan(blocks, free, 14);
        assert_eq!(
            chosen.moves().len(),
            widest.moves().len().min(tail.moves().len())
        );
    }

    #[test]
    fn several_holes_are_all_filled() {
        let p = layout(&[(1, 1), (3, 1), (5, 1), (6, 1)], &[(0, 1), (2, 1), (4, 1)]);
        assert_eq!(p.num_indices_after(), 4);
        assert_eq!(p.moves().len(), 2);
        for m in p.moves() {
            assert!(m.target < m.source.start);
        }
    }
}
