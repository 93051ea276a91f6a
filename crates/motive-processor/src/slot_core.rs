//! Type-independent slot bookkeeping shared by every processor.

use crossbeam_channel::{Receiver, Sender};
use motive_core::{Dimension, HandleBinding, HandleId, ProcessorId, SlotError, SlotIndex};
use motive_slots::{
    AllocatorCallbacks, DefragPlan, HandleTable, IndexAllocator, IndexRange, OwnershipTable,
    SlotConfig, SlotStats,
};
use tracing::debug;

use crate::storage::SlotStorage;

/// Allocator, ownership table and handle table of one processor.
///
/// Every structural operation takes the processor's storage as an explicit
/// `&mut S` and drives its hooks, so the core and the storage arrays never
/// disagree about `num_indices` once the call returns.
///
/// Handles dropped on the client side arrive through a release queue and
/// are retired at the start of the next [`defragment`](Self::defragment).
#[derive(Debug)]
pub struct ProcessorCore {
    id: ProcessorId,
    pub(crate) allocator: IndexAllocator,
    pub(crate) owners: OwnershipTable,
    pub(crate) handles: HandleTable,
    release_tx: Sender<HandleId>,
    release_rx: Receiver<HandleId>,
}

/// Forwards allocator notifications to the ownership table and storage.
///
/// The ownership table is resized and relocated in the same callback that
/// reshapes storage, so handles already resolve to the new index when the
/// allocator moves on to the next block.
struct StorageCallbacks<'a, S: ?Sized> {
    owners: &'a mut OwnershipTable,
    handles: &'a mut HandleTable,
    storage: &'a mut S,
}

impl<S: SlotStorage + ?Sized> AllocatorCallbacks for StorageCallbacks<'_, S> {
    fn set_num_indices(&mut self, num_indices: SlotIndex) {
        self.owners.resize(num_indices);
        self.storage.set_num_indices(num_indices);
    }

    fn move_index_range(&mut self, source: IndexRange, target: SlotIndex) {
        self.storage.move_indices(source.start, target, source.len);
        self.owners.relocate(source.start, target, self.handles);
    }
}

impl ProcessorCore {
    /// Create an empty core with the default configuration.
    pub fn new() -> Self {
        Self::build(&SlotConfig::default())
    }

    /// Create an empty core after validating `config`.
    ///
    /// # Errors
    ///
    /// [`SlotError::InvalidConfig`] if the config is rejected.
    pub fn with_config(config: &SlotConfig) -> Result<Self, SlotError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &SlotConfig) -> Self {
        let capacity = config.initial_capacity as usize;
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        Self {
            id: ProcessorId::next(),
            allocator: IndexAllocator::with_config(config),
            owners: OwnershipTable::with_capacity(capacity),
            handles: HandleTable::with_capacity(capacity),
            release_tx,
            release_rx,
        }
    }

    /// Process-unique identity of this core.
    pub fn id(&self) -> ProcessorId {
        self.id
    }

    /// Current length of the storage arrays.
    pub fn num_indices(&self) -> SlotIndex {
        self.allocator.num_indices()
    }

    /// Read-only access to the allocator.
    pub fn allocator(&self) -> &IndexAllocator {
        &self.allocator
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> SlotStats {
        self.allocator.stats()
    }

    // ── Handles ────────────────────────────────────────────────

    /// Register a fresh, unbound handle.
    pub fn new_handle(&mut self) -> HandleId {
        self.handles.insert()
    }

    /// Retire `handle`, removing its block first if it still owns one.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn release_handle<S>(&mut self, storage: &mut S, handle: HandleId) -> bool
    where
        S: SlotStorage + ?Sized,
    {
        if let Some(index) = self.handles.bound_index(handle) {
            self.remove_slot(storage, index);
        }
        self.handles.remove(handle)
    }

    /// The index `handle` is currently bound to.
    pub fn index_of(&self, handle: HandleId) -> Option<SlotIndex> {
        self.handles.bound_index(handle)
    }

    /// Whether `handle` is live in this core (bound or not).
    pub fn contains_handle(&self, handle: HandleId) -> bool {
        self.handles.contains(handle)
    }

    /// Sending half of the release queue.
    ///
    /// A handle sent here is retired by the next
    /// [`drain_released`](Self::drain_released). Stale handles are ignored
    /// when drained.
    pub fn release_sender(&self) -> Sender<HandleId> {
        self.release_tx.clone()
    }

    /// Number of handles waiting in the release queue.
    pub fn pending_releases(&self) -> usize {
        self.release_rx.len()
    }

    /// Retire every handle waiting in the release queue.
    ///
    /// Bound handles have their block removed through `remove_slot`, so
    /// `remove_indices` runs for each. Returns how many live handles were
    /// retired.
    pub fn drain_released<S>(&mut self, storage: &mut S) -> usize
    where
        S: SlotStorage + ?Sized,
    {
        let pending: Vec<HandleId> = self.release_rx.try_iter().collect();
        let mut released = 0;
        for handle in pending {
            if self.release_handle(storage, handle) {
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, "retired dropped handles");
        }
        released
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Allocate a block of `width` for `handle` and initialize it.
    ///
    /// May grow storage through `set_num_indices` before running
    /// `initialize_indices` on the new block.
    ///
    /// # Errors
    ///
    /// [`SlotError::CapacityExceeded`] if no block fits below the
    /// configured maximum. Nothing changes in that case.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero, or if `handle` is stale or already bound.
    pub fn initialize_slot<S>(
        &mut self,
        storage: &mut S,
        init: &S::Init,
        width: Dimension,
        handle: HandleId,
    ) -> Result<SlotIndex, SlotError>
    where
        S: SlotStorage + ?Sized,
    {
        assert!(
            self.handles.contains(handle) && !self.handles.is_bound(handle),
            "handle {handle} is stale or already owns a slot"
        );
        let mut callbacks = StorageCallbacks {
            owners: &mut self.owners,
            handles: &mut self.handles,
            storage: &mut *storage,
        };
        let index = self.allocator.allocate(width, &mut callbacks)?;
        self.owners.bind(index, handle, width);
        self.handles.bind(handle, index);
        storage.initialize_indices(index, width, init);
        debug!(index, width, %handle, "initialized slot");
        Ok(index)
    }

    /// Release the block whose head is `index`.
    ///
    /// Runs `remove_indices`, returns the range to the allocator, and
    /// unbinds and invalidates the owning handle in one step.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not an owned block head.
    pub fn remove_slot<S>(&mut self, storage: &mut S, index: SlotIndex)
    where
        S: SlotStorage + ?Sized,
    {
        let width = self.allocator.count_for_index(index);
        assert!(
            width > 0 && self.owners.lookup(index).is_some(),
            "remove_slot({index}): not an owned block head"
        );
        storage.remove_indices(index, width);
        self.allocator.release(index, width);
        if let Some(ownership) = self.owners.unbind(index) {
            self.handles.notify_invalidated(ownership.handle);
            debug!(index, width, handle = %ownership.handle, "removed slot");
        }
    }

    /// Hand the block at `index` to `new_handle`.
    ///
    /// The previous owner is invalidated. No storage hook runs and the
    /// block's data is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not an owned block head, or if `new_handle`
    /// is stale or already bound.
    pub fn transfer_slot(&mut self, index: SlotIndex, new_handle: HandleId) {
        assert!(
            self.valid_owning_index(index),
            "transfer_slot({index}): not an owned block head"
        );
        if self.owners.lookup(index) == Some(new_handle) {
            return;
        }
        assert!(
            self.handles.contains(new_handle) && !self.handles.is_bound(new_handle),
            "transfer_slot({index}): handle {new_handle} is stale or already owns a slot"
        );
        let previous = self.owners.rebind(index, new_handle);
        self.handles.notify_invalidated(previous);
        self.handles.bind(new_handle, index);
    }

    /// Pack all blocks towards index 0 and shrink storage.
    ///
    /// Handles waiting in the release queue are retired first, so their
    /// blocks are compacted away in the same pass. Every relocated handle
    /// resolves to its new index once this returns.
    pub fn defragment<S>(&mut self, storage: &mut S) -> DefragPlan
    where
        S: SlotStorage + ?Sized,
    {
        self.drain_released(storage);
        let mut callbacks = StorageCallbacks {
            owners: &mut self.owners,
            handles: &mut self.handles,
            storage,
        };
        self.allocator.defragment(&mut callbacks)
    }

    /// Drop every block at once.
    ///
    /// No `remove_indices` hook runs; storage is shrunk to zero through
    /// `set_num_indices`, which must release whatever the cells held.
    /// Handles waiting in the release queue are retired; every other handle
    /// is left live but unbound.
    pub fn reset<S>(&mut self, storage: &mut S)
    where
        S: SlotStorage + ?Sized,
    {
        let dropped = self.allocator.num_blocks();
        self.handles.invalidate_all();
        for handle in self.release_rx.try_iter() {
            self.handles.remove(handle);
        }
        self.allocator.clear();
        self.owners.clear();
        storage.set_num_indices(0);
        debug!(blocks = dropped, "reset processor slots");
    }

    // ── Queries ────────────────────────────────────────────────

    /// Whether a handle is bound at `index`.
    ///
    /// Only consults the ownership table; true exactly for owned heads.
    pub fn is_slot_index(&self, index: SlotIndex) -> bool {
        self.owners.lookup(index).is_some()
    }

    /// Whether `index` lies inside a used block.
    pub fn valid_index(&self, index: SlotIndex) -> bool {
        index < self.num_indices() && self.allocator.is_used(index)
    }

    /// Whether `index` is a used block head with an owner.
    pub fn valid_owning_index(&self, index: SlotIndex) -> bool {
        self.allocator.is_block_head(index) && self.owners.lookup(index).is_some()
    }

    /// Whether the block at `index` is owned by `handle`.
    pub fn valid_motivator(&self, index: SlotIndex, handle: HandleId) -> bool {
        self.valid_index(index) && self.owners.lookup(index) == Some(handle)
    }

    /// Width of the block whose head is `index`, or 0.
    pub fn dimensions(&self, index: SlotIndex) -> Dimension {
        self.allocator.count_for_index(index)
    }

    /// The handle owning the block at `index`.
    pub fn owner(&self, index: SlotIndex) -> Option<HandleId> {
        self.owners.lookup(index)
    }

    /// Used blocks, lowest index first.
    pub fn blocks(&self) -> impl Iterator<Item = IndexRange> + '_ {
        self.allocator.used_blocks()
    }
}

impl Default for ProcessorCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One `u32` tag per index; 0 is the reset state.
    #[derive(Default)]
    struct Tags {
        cells: Vec<u32>,
        removed: Vec<(SlotIndex, Dimension)>,
    }

    impl SlotStorage for Tags {
        type Init = u32;

        fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &u32) {
            let start = index as usize;
            self.cells[start..start + width as usize].fill(*init);
        }

        fn remove_indices(&mut self, index: SlotIndex, width: Dimension) {
            let start = index as usize;
            self.cells[start..start + width as usize].fill(0);
            self.removed.push((index, width));
        }

        fn move_indices(&mut self, old_index: SlotIndex, new_index: SlotIndex, width: Dimension) {
            let start = old_index as usize;
            self.cells
                .copy_within(start..start + width as usize, new_index as usize);
        }

        fn set_num_indices(&mut self, num_indices: SlotIndex) {
            self.cells.resize(num_indices as usize, 0);
        }
    }

    fn init(core: &mut ProcessorCore, tags: &mut Tags, tag: u32, width: Dimension) -> HandleId {
        let h = core.new_handle();
        core.initialize_slot(tags, &tag, width, h).unwrap();
        h
    }

    #[test]
    fn initialize_grows_storage_and_binds() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let h = init(&mut core, &mut tags, 7, 3);
        assert_eq!(core.index_of(h), Some(0));
        assert_eq!(core.num_indices(), 3);
        assert_eq!(tags.cells, vec![7, 7, 7]);
        assert_eq!(core.dimensions(0), 3);
        assert_eq!(core.owner(0), Some(h));
    }

    #[test]
    fn remove_invalidates_owner() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let h = init(&mut core, &mut tags, 7, 2);
        core.remove_slot(&mut tags, 0);
        assert_eq!(core.index_of(h), None);
        assert!(core.contains_handle(h));
        assert_eq!(tags.removed, vec![(0, 2)]);
        assert_eq!(tags.cells, vec![0, 0]);
        assert!(!core.is_slot_index(0));
    }

    #[test]
    fn predicates_distinguish_heads_and_interiors() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let h = init(&mut core, &mut tags, 1, 3);

        assert!(core.is_slot_index(0));
        assert!(!core.is_slot_index(1));
        assert!(core.valid_index(1));
        assert!(!core.valid_owning_index(1));
        assert!(core.valid_owning_index(0));
        assert!(core.valid_motivator(0, h));
        assert!(!core.valid_index(3));
    }

    #[test]
    fn transfer_moves_ownership_only() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let a = init(&mut core, &mut tags, 5, 2);
        let b = core.new_handle();

        core.transfer_slot(0, b);

        assert_eq!(core.index_of(a), None);
        assert_eq!(core.index_of(b), Some(0));
        assert_eq!(core.dimensions(0), 2);
        assert_eq!(tags.cells, vec![5, 5]);
        assert!(tags.removed.is_empty());
    }

    #[test]
    #[should_panic(expected = "not an owned block head")]
    fn transfer_of_free_index_panics() {
        let mut core = ProcessorCore::new();
        let h = core.new_handle();
        core.transfer_slot(0, h);
    }

    #[test]
    #[should_panic(expected = "not an owned block head")]
    fn remove_of_interior_index_panics() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        init(&mut core, &mut tags, 1, 2);
        core.remove_slot(&mut tags, 1);
    }

    #[test]
    fn capacity_error_leaves_state_unchanged() {
        let config = SlotConfig::new(4);
        let mut core = ProcessorCore::with_config(&config).unwrap();
        let mut tags = Tags::default();
        init(&mut core, &mut tags, 1, 3);
        let h = core.new_handle();

        let err = core.initialize_slot(&mut tags, &2, 2, h).unwrap_err();

        assert!(matches!(err, SlotError::CapacityExceeded { requested: 2, .. }));
        assert_eq!(core.num_indices(), 3);
        assert_eq!(tags.cells.len(), 3);
        assert_eq!(core.index_of(h), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SlotConfig {
            initial_capacity: 8,
            max_indices: 0,
        };
        assert!(matches!(
            ProcessorCore::with_config(&config),
            Err(SlotError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn release_handle_removes_bound_block() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let h = init(&mut core, &mut tags, 3, 1);
        assert!(core.release_handle(&mut tags, h));
        assert!(!core.contains_handle(h));
        assert!(!core.is_slot_index(0));
        assert!(!core.release_handle(&mut tags, h));
    }

    #[test]
    fn defragment_updates_handles() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        init(&mut core, &mut tags, 1, 2);
        init(&mut core, &mut tags, 2, 1);
        let c = init(&mut core, &mut tags, 3, 2);
        core.remove_slot(&mut tags, 0);

        let plan = core.defragment(&mut tags);

        assert_eq!(plan.moves().len(), 1);
        assert_eq!(core.index_of(c), Some(0));
        assert_eq!(core.num_indices(), 3);
        assert_eq!(tags.cells, vec![3, 3, 2]);
    }

    #[test]
    fn reset_unbinds_everything_without_remove_hooks() {
        let mut core = ProcessorCore::new();
        let mut tags = Tags::default();
        let a = init(&mut core, &mut tags, 1, 2);
        let b = init(&mut core, &mut tags, 2, 1);

        core.reset(&mut tags);

        assert_eq!(core.num_indices(), 0);
        assert!(tags.cells.is_empty());
        assert!(tags.removed.is_empty());
        assert_eq!(core.index_of(a), None);
        assert_eq!(core.index_of(b), None);
        assert!(core.contains_handle(a));

        // Handles are reusable after a reset.
        core.initialize_slot(&mut tags, &9, 1, a).unwrap();
        assert_eq!(core.index_of(a), Some(0));
    }
}
