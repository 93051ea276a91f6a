//! The notification contract between the slot core and client handles.

use crate::id::{HandleId, SlotIndex};

/// Receives relocation and invalidation notices for bound handles.
///
/// The ownership table never touches handle internals directly. When a
/// block moves during defragmentation, or when the block is removed or
/// handed to another handle, the previous owner learns about it through
/// this trait. Implementations store at most one index per handle.
pub trait HandleBinding {
    /// The block owned by `handle` now starts at `new_index`.
    fn notify_relocated(&mut self, handle: HandleId, new_index: SlotIndex);

    /// `handle` no longer owns any block.
    fn notify_invalidated(&mut self, handle: HandleId);

    /// The index `handle` is currently bound to, if any.
    fn bound_index(&self, handle: HandleId) -> Option<SlotIndex>;
}
