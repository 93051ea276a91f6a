//! Reusable processor storage fixture.
//!
//! [`RecordingStorage`] keeps one `u32` tag per index. `initialize_indices`
//! writes the init tag into every cell of the block, so after any sequence
//! of operations the tag array shows exactly which block each cell belongs
//! to. Every hook call is also appended to a log for ordering assertions.

use motive_core::{Dimension, MotiveTime, ProcessorKind, SlotIndex, VerifyError};
use motive_processor::{check_table_len, Animator, ProcessorCore, SlotStorage};

/// A storage hook invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookCall {
    Initialize {
        index: SlotIndex,
        width: Dimension,
        tag: u32,
    },
    Remove {
        index: SlotIndex,
        width: Dimension,
    },
    Move {
        old_index: SlotIndex,
        new_index: SlotIndex,
        width: Dimension,
    },
    SetNumIndices(SlotIndex),
}

/// Tag-array storage that records every hook call.
#[derive(Clone, Debug, Default)]
pub struct RecordingStorage {
    pub tags: Vec<u32>,
    pub calls: Vec<HookCall>,
    pub frames: Vec<MotiveTime>,
}

impl RecordingStorage {
    /// Tag of a cell in the reset state.
    pub const RESET: u32 = u32::MAX;

    pub fn new() -> Self {
        Self::default()
    }

    /// The tags of `[index, index + width)`.
    pub fn block(&self, index: SlotIndex, width: Dimension) -> &[u32] {
        let start = index as usize;
        &self.tags[start..start + width as usize]
    }

    /// Forget recorded calls, keeping the tags.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Recorded moves as `(old_index, new_index, width)`.
    pub fn moves(&self) -> Vec<(SlotIndex, SlotIndex, Dimension)> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                HookCall::Move {
                    old_index,
                    new_index,
                    width,
                } => Some((old_index, new_index, width)),
                _ => None,
            })
            .collect()
    }
}

impl SlotStorage for RecordingStorage {
    type Init = u32;

    fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &u32) {
        let start = index as usize;
        self.tags[start..start + width as usize].fill(*init);
        self.calls.push(HookCall::Initialize {
            index,
            width,
            tag: *init,
        });
    }

    fn remove_indices(&mut self, index: SlotIndex, width: Dimension) {
        let start = index as usize;
        self.tags[start..start + width as usize].fill(Self::RESET);
        self.calls.push(HookCall::Remove { index, width });
    }

    fn move_indices(&mut self, old_index: SlotIndex, new_index: SlotIndex, width: Dimension) {
        let start = old_index as usize;
        self.tags
            .copy_within(start..start + width as usize, new_index as usize);
        self.calls.push(HookCall::Move {
            old_index,
            new_index,
            width,
        });
    }

    fn set_num_indices(&mut self, num_indices: SlotIndex) {
        self.tags.resize(num_indices as usize, Self::RESET);
        self.calls.push(HookCall::SetNumIndices(num_indices));
    }

    fn verify_storage(&self, num_indices: SlotIndex) -> Result<(), VerifyError> {
        check_table_len("tags", self.tags.len(), num_indices)
    }
}

impl Animator for RecordingStorage {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind("recording")
    }

    fn priority(&self) -> i32 {
        0
    }

    fn advance_frame(&mut self, delta_time: MotiveTime, _slots: &ProcessorCore) {
        self.frames.push(delta_time);
    }
}
