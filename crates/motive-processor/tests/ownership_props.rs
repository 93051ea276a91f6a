//! Property test: ownership stays one-to-one under random churn.
//!
//! Random sequences of initialize / remove / drop / transfer / defragment /
//! reset are applied to a `Processor<RecordingStorage>`. After every step each
//! live motivator must resolve to a block still tagged with its own tag,
//! and the internal state check must pass.

#![cfg(not(miri))]

use std::collections::HashSet;

use motive_core::Dimension;
use motive_processor::{Motivator, Processor};
use motive_test_utils::RecordingStorage;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Init(Dimension),
    Invalidate(usize),
    Drop(usize),
    Transfer(usize),
    Defrag,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (1u32..6).prop_map(Op::Init),
        3 => any::<usize>().prop_map(Op::Invalidate),
        2 => any::<usize>().prop_map(Op::Drop),
        2 => any::<usize>().prop_map(Op::Transfer),
        2 => Just(Op::Defrag),
        1 => Just(Op::Reset),
    ]
}

/// A motivator plus the tag and width its block was initialized with.
struct Live {
    motivator: Motivator,
    tag: u32,
    width: Dimension,
}

proptest! {
    #[test]
    fn every_block_has_exactly_one_owner(ops in proptest::collection::vec(op(), 1..120)) {
        let mut p = Processor::new(RecordingStorage::new());
        let mut live: Vec<Live> = Vec::new();
        let mut next_tag = 0u32;
        // Blocks whose motivator was dropped and not yet compacted away.
        let mut dropped = 0usize;

        for op in ops {
            match op {
                Op::Init(width) => {
                    let mut motivator = Motivator::new();
                    motivator.initialize(&mut p, &next_tag, width).unwrap();
                    live.push(Live { motivator, tag: next_tag, width });
                    next_tag += 1;
                }
                Op::Invalidate(pick) if !live.is_empty() => {
                    let mut gone = live.swap_remove(pick % live.len());
                    gone.motivator.invalidate(&mut p).unwrap();
                }
                Op::Drop(pick) if !live.is_empty() => {
                    drop(live.swap_remove(pick % live.len()));
                    dropped += 1;
                }
                Op::Transfer(pick) if !live.is_empty() => {
                    let idx = pick % live.len();
                    let entry = &mut live[idx];
                    let mut target = Motivator::new();
                    target.transfer_from(&mut entry.motivator, &mut p).unwrap();
                    prop_assert!(!entry.motivator.is_valid(&p));
                    entry.motivator = target;
                }
                Op::Invalidate(_) | Op::Drop(_) | Op::Transfer(_) => {}
                Op::Defrag => {
                    let _ = p.defragment();
                    dropped = 0;
                    prop_assert_eq!(p.core().pending_releases(), 0);
                    prop_assert_eq!(p.core().allocator().free_ranges().count(), 0);
                }
                Op::Reset => {
                    p.reset();
                    dropped = 0;
                    let unbound = live.len();
                    for entry in live.drain(..) {
                        prop_assert!(!entry.motivator.is_valid(&p));
                    }
                    // Handles of the motivators dropped above, live but unbound.
                    prop_assert_eq!(p.core().pending_releases(), unbound);
                }
            }

            prop_assert_eq!(p.verify_internal_state(), Ok(()));
            prop_assert_eq!(p.storage().tags.len(), p.num_indices() as usize);
            prop_assert_eq!(p.stats().blocks, live.len() + dropped);

            let mut owners = HashSet::new();
            for entry in &live {
                let index = entry.motivator.index(&p).unwrap();
                prop_assert_eq!(p.dimensions(index), entry.width);
                prop_assert!(p.storage().block(index, entry.width).iter().all(|&t| t == entry.tag));
                prop_assert!(owners.insert(entry.motivator.handle()));
            }
        }
    }
}
