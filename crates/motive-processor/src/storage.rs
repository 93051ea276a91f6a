//! The storage-shaping boundary between the slot core and a processor.
//!
//! A concrete processor is a type holding one or more arrays indexed by
//! [`SlotIndex`]. It implements [`SlotStorage`] so that the core can keep
//! those arrays in lockstep with its bookkeeping, and [`Animator`] so that
//! an engine can run it once per frame.
//!
//! # Examples
//!
//! A processor that holds one float per slot and never animates it:
//!
//! ```
//! use motive_core::{Dimension, MotiveTime, ProcessorKind, SlotIndex, VerifyError};
//! use motive_processor::{Animator, Processor, ProcessorCore, SlotStorage};
//!
//! #[derive(Default)]
//! struct Constant {
//!     values: Vec<f32>,
//! }
//!
//! impl SlotStorage for Constant {
//!     type Init = f32;
//!
//!     fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &f32) {
//!         let start = index as usize;
//!         self.values[start..start + width as usize].fill(*init);
//!     }
//!     fn remove_indices(&mut self, index: SlotIndex, width: Dimension) {
//!         let start = index as usize;
//!         self.values[start..start + width as usize].fill(0.0);
//!     }
//!     fn move_indices(&mut self, old: SlotIndex, new: SlotIndex, width: Dimension) {
//!         let start = old as usize;
//!         self.values.copy_within(start..start + width as usize, new as usize);
//!     }
//!     fn set_num_indices(&mut self, num_indices: SlotIndex) {
//!         self.values.resize(num_indices as usize, 0.0);
//!     }
//! }
//!
//! impl Animator for Constant {
//!     fn kind(&self) -> ProcessorKind { ProcessorKind("constant") }
//!     fn priority(&self) -> i32 { 0 }
//!     fn advance_frame(&mut self, _delta_time: MotiveTime, _slots: &ProcessorCore) {}
//! }
//!
//! let mut processor = Processor::new(Constant::default());
//! let handle = processor.new_handle();
//! let index = processor.initialize_slot(&1.5, 3, handle).unwrap();
//! assert_eq!(processor.storage().values[index as usize + 2], 1.5);
//! ```

use motive_core::{Dimension, MotiveTime, ProcessorKind, SlotIndex, VerifyError};

use crate::slot_core::ProcessorCore;

/// Hooks through which the slot core reshapes a processor's arrays.
///
/// All hooks are infallible: they only copy, fill and resize memory the
/// processor owns. Indices passed in are always below the current
/// `num_indices`.
pub trait SlotStorage {
    /// Typed initialization parameters for one block.
    type Init;

    /// Populate `[index, index + width)` from `init`.
    ///
    /// The range was free (in the reset state) before the call.
    fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &Self::Init);

    /// Release per-slot resources in `[index, index + width)`.
    ///
    /// Plain array storage has nothing to free, but should reset the cells
    /// so stale data is easy to spot while debugging.
    fn remove_indices(&mut self, index: SlotIndex, width: Dimension);

    /// Copy the `width` cells starting at `old_index` to `new_index`.
    ///
    /// `new_index < old_index`. The destination holds no other live block
    /// but may overlap the source, so copies must be overlap-safe
    /// (`<[T]>::copy_within`, or an ascending element-by-element move).
    fn move_indices(&mut self, old_index: SlotIndex, new_index: SlotIndex, width: Dimension);

    /// Resize every array to exactly `num_indices` cells.
    ///
    /// Growth must put new cells in the reset state. Cells at or past
    /// `num_indices` are destroyed on shrink.
    fn set_num_indices(&mut self, num_indices: SlotIndex);

    /// Check that every backing array is `num_indices` long.
    ///
    /// Called by [`Processor::verify_internal_state`](crate::Processor::verify_internal_state)
    /// after the core's own checks. Use [`check_table_len`](crate::check_table_len)
    /// once per array.
    ///
    /// # Errors
    ///
    /// The first array whose length is off.
    fn verify_storage(&self, num_indices: SlotIndex) -> Result<(), VerifyError> {
        let _ = num_indices;
        Ok(())
    }
}

/// Per-frame behaviour of a processor type.
pub trait Animator: SlotStorage {
    /// Stable identity of the processor type.
    fn kind(&self) -> ProcessorKind;

    /// Update order; lower runs first. Must never change.
    ///
    /// Processors that read other processors' output run after them.
    fn priority(&self) -> i32;

    /// Advance every live block by `delta_time`.
    ///
    /// `slots` answers which indices are live, so unused cells can be
    /// skipped.
    fn advance_frame(&mut self, delta_time: MotiveTime, slots: &ProcessorCore);
}
