//! Benchmark profiles and utilities for the Motive slot core.
//!
//! Provides deterministic workloads for benchmarks:
//!
//! - [`churn_script`]: a seeded sequence of initialize / invalidate ops
//! - [`run_churn`]: applies a script to a scalar processor
//! - [`fragmented_processor`]: a scalar processor with holes of mixed width

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use motive_core::Dimension;
use motive_processor::{Motivator, Processor};
use motive_processors::{ScalarInit, ScalarProcessor};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Initialize a new motivator of this width.
    Init(Dimension),
    /// Invalidate the live motivator at this position (modulo the count).
    Invalidate(usize),
}

/// Generate `len` churn ops with widths in `1..=max_width`.
///
/// Roughly 60% of the ops initialize, so the live set grows slowly while
/// leaving plenty of holes behind.
pub fn churn_script(seed: u64, len: usize, max_width: Dimension) -> Vec<ChurnOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let roll = rng.next_u32();
            if roll % 10 < 6 {
                ChurnOp::Init(1 + rng.next_u32() % max_width)
            } else {
                ChurnOp::Invalidate(rng.next_u32() as usize)
            }
        })
        .collect()
}

/// Apply `script` to `processor`, returning the motivators still live.
///
/// # Panics
///
/// Panics if the processor runs out of capacity.
pub fn run_churn(
    processor: &mut Processor<ScalarProcessor>,
    script: &[ChurnOp],
) -> Vec<Motivator> {
    let mut live = Vec::new();
    for op in script {
        match *op {
            ChurnOp::Init(width) => {
                let mut m = Motivator::new();
                let start = live.len() as f32;
                m.initialize(processor, &ScalarInit::uniform(start, 0.0, 1.0), width)
                    .expect("benchmark processor out of capacity");
                live.push(m);
            }
            ChurnOp::Invalidate(pick) if !live.is_empty() => {
                let mut m = live.swap_remove(pick % live.len());
                m.invalidate(processor)
                    .expect("motivator bound to another processor");
            }
            ChurnOp::Invalidate(_) => {}
        }
    }
    live
}

/// Build a processor of `blocks` blocks and invalidate every other one.
///
/// Returns the processor and the surviving motivators.
pub fn fragmented_processor(
    blocks: usize,
    seed: u64,
) -> (Processor<ScalarProcessor>, Vec<Motivator>) {
    let mut processor = Processor::new(ScalarProcessor::new());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut kept = Vec::with_capacity(blocks / 2);
    for i in 0..blocks {
        let mut m = Motivator::new();
        let width = 1 + rng.next_u32() % 4;
        m.initialize(&mut processor, &ScalarInit::uniform(i as f32, 0.0, 0.5), width)
            .expect("benchmark processor out of capacity");
        if i % 2 == 0 {
            m.invalidate(&mut processor)
                .expect("motivator bound to another processor");
        } else {
            kept.push(m);
        }
    }
    (processor, kept)
}
