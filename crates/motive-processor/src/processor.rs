//! A slot core paired with its storage.

use motive_core::{
    Dimension, HandleId, MotiveTime, ProcessorId, ProcessorKind, SlotError, SlotIndex,
    VerifyError,
};
use motive_slots::{DefragPlan, SlotConfig, SlotStats};
use tracing::{trace, warn};

use crate::slot_core::ProcessorCore;
use crate::storage::{Animator, SlotStorage};

/// A processor: bookkeeping plus the arrays it describes.
///
/// Owning both halves lets every lifecycle call drive the storage hooks
/// without the caller threading `&mut S` through by hand.
#[derive(Debug)]
pub struct Processor<S> {
    core: ProcessorCore,
    storage: S,
}

impl<S: SlotStorage> Processor<S> {
    /// Wrap `storage` with a default-configured core.
    ///
    /// `storage` should be empty; it is sized through `set_num_indices` on
    /// first allocation.
    pub fn new(storage: S) -> Self {
        Self {
            core: ProcessorCore::new(),
            storage,
        }
    }

    /// Wrap `storage` with a core built from `config`.
    ///
    /// # Errors
    ///
    /// [`SlotError::InvalidConfig`] if the config is rejected.
    pub fn with_config(storage: S, config: &SlotConfig) -> Result<Self, SlotError> {
        Ok(Self {
            core: ProcessorCore::with_config(config)?,
            storage,
        })
    }

    /// The slot bookkeeping.
    pub fn core(&self) -> &ProcessorCore {
        &self.core
    }

    /// The backing arrays.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the backing arrays.
    ///
    /// Writing values is fine; resizing or reordering them behind the
    /// core's back is not.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Process-unique identity.
    pub fn id(&self) -> ProcessorId {
        self.core.id()
    }

    /// Current length of the storage arrays.
    pub fn num_indices(&self) -> SlotIndex {
        self.core.num_indices()
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> SlotStats {
        self.core.stats()
    }

    /// See [`ProcessorCore::new_handle`].
    pub fn new_handle(&mut self) -> HandleId {
        self.core.new_handle()
    }

    /// See [`ProcessorCore::release_handle`].
    pub fn release_handle(&mut self, handle: HandleId) -> bool {
        self.core.release_handle(&mut self.storage, handle)
    }

    /// See [`ProcessorCore::index_of`].
    pub fn index_of(&self, handle: HandleId) -> Option<SlotIndex> {
        self.core.index_of(handle)
    }

    /// See [`ProcessorCore::initialize_slot`].
    ///
    /// # Errors
    ///
    /// [`SlotError::CapacityExceeded`] when storage cannot grow.
    pub fn initialize_slot(
        &mut self,
        init: &S::Init,
        width: Dimension,
        handle: HandleId,
    ) -> Result<SlotIndex, SlotError> {
        self.core
            .initialize_slot(&mut self.storage, init, width, handle)
    }

    /// See [`ProcessorCore::remove_slot`].
    pub fn remove_slot(&mut self, index: SlotIndex) {
        self.core.remove_slot(&mut self.storage, index);
    }

    /// See [`ProcessorCore::transfer_slot`].
    pub fn transfer_slot(&mut self, index: SlotIndex, new_handle: HandleId) {
        self.core.transfer_slot(index, new_handle);
    }

    /// See [`ProcessorCore::drain_released`].
    pub fn drain_released(&mut self) -> usize {
        self.core.drain_released(&mut self.storage)
    }

    /// See [`ProcessorCore::defragment`].
    pub fn defragment(&mut self) -> DefragPlan {
        self.core.defragment(&mut self.storage)
    }

    /// See [`ProcessorCore::reset`].
    pub fn reset(&mut self) {
        self.core.reset(&mut self.storage);
    }

    /// See [`ProcessorCore::is_slot_index`].
    pub fn is_slot_index(&self, index: SlotIndex) -> bool {
        self.core.is_slot_index(index)
    }

    /// See [`ProcessorCore::valid_index`].
    pub fn valid_index(&self, index: SlotIndex) -> bool {
        self.core.valid_index(index)
    }

    /// See [`ProcessorCore::valid_owning_index`].
    pub fn valid_owning_index(&self, index: SlotIndex) -> bool {
        self.core.valid_owning_index(index)
    }

    /// See [`ProcessorCore::valid_motivator`].
    pub fn valid_motivator(&self, index: SlotIndex, handle: HandleId) -> bool {
        self.core.valid_motivator(index, handle)
    }

    /// See [`ProcessorCore::dimensions`].
    pub fn dimensions(&self, index: SlotIndex) -> Dimension {
        self.core.dimensions(index)
    }

    /// Check the core's bookkeeping, then the storage array lengths.
    ///
    /// # Errors
    ///
    /// The first inconsistency found.
    pub fn verify_internal_state(&self) -> Result<(), VerifyError> {
        self.core.verify_internal_state()?;
        self.storage
            .verify_storage(self.core.num_indices())
            .inspect_err(|err| {
                warn!(processor = %self.id(), error = %err, "storage out of step");
            })
    }
}

impl<S: Animator> Processor<S> {
    /// Compact, then advance every live block by `delta_time`.
    pub fn advance_frame(&mut self, delta_time: MotiveTime) {
        let _ = self.core.defragment(&mut self.storage);
        trace!(kind = %self.storage.kind(), delta_time, "advancing processor");
        self.storage.advance_frame(delta_time, &self.core);
    }
}

/// Type-erased per-frame interface of a processor.
///
/// An engine keeps `Vec<Box<dyn FrameProcessor>>`, sorts it by
/// [`priority`](Self::priority) once, and calls
/// [`advance_frame`](Self::advance_frame) on each entry every frame.
pub trait FrameProcessor {
    /// Process-unique identity.
    fn id(&self) -> ProcessorId;

    /// Stable identity of the processor type.
    fn kind(&self) -> ProcessorKind;

    /// Update order; lower runs first.
    fn priority(&self) -> i32;

    /// Compact, then advance every live block.
    fn advance_frame(&mut self, delta_time: MotiveTime);

    /// Compact without advancing.
    fn defragment(&mut self) -> DefragPlan;

    /// Debug-time consistency check.
    ///
    /// # Errors
    ///
    /// The first inconsistency found.
    fn verify_internal_state(&self) -> Result<(), VerifyError>;
}

impl<S: Animator> FrameProcessor for Processor<S> {
    fn id(&self) -> ProcessorId {
        Processor::id(self)
    }

    fn kind(&self) -> ProcessorKind {
        self.storage.kind()
    }

    fn priority(&self) -> i32 {
        self.storage.priority()
    }

    fn advance_frame(&mut self, delta_time: MotiveTime) {
        Processor::advance_frame(self, delta_time);
    }

    fn defragment(&mut self) -> DefragPlan {
        Processor::defragment(self)
    }

    fn verify_internal_state(&self) -> Result<(), VerifyError> {
        Processor::verify_internal_state(self)
    }
}
