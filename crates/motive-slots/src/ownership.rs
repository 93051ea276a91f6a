//! Block head → owning handle mapping.

use motive_core::{Dimension, HandleBinding, HandleId, SlotIndex};

/// The owner of one block and the width it was initialized with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    /// The handle bound to the block.
    pub handle: HandleId,
    /// Width recorded when the block was initialized.
    pub width: Dimension,
}

/// Per-index record of which handle owns the block starting there.
///
/// Only block heads carry a record; interior and free indices hold `None`.
/// The table is kept exactly `num_indices` long so that it can be resized
/// in the same callback as the processor's backing arrays.
#[derive(Clone, Debug, Default)]
pub struct OwnershipTable {
    owners: Vec<Option<Ownership>>,
}

impl OwnershipTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` indices.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            owners: Vec::with_capacity(capacity),
        }
    }

    /// Number of indices covered (equals the allocator's `num_indices`).
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the table covers no indices.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Grow or shrink to `num_indices` entries. New entries are unowned.
    pub fn resize(&mut self, num_indices: SlotIndex) {
        debug_assert!(
            self.owners[(num_indices as usize).min(self.owners.len())..]
                .iter()
                .all(Option::is_none),
            "shrinking ownership table to {num_indices} drops live bindings"
        );
        self.owners.resize(num_indices as usize, None);
    }

    /// Record `handle` as the owner of the block of `width` at `index`.
    ///
    /// Only called right after allocation, when the index cannot carry a
    /// previous binding.
    pub fn bind(&mut self, index: SlotIndex, handle: HandleId, width: Dimension) {
        let slot = &mut self.owners[index as usize];
        debug_assert!(slot.is_none(), "index {index} is already owned by {slot:?}");
        *slot = Some(Ownership { handle, width });
    }

    /// Clear the record at `index`, returning it.
    ///
    /// The caller must invalidate the returned handle as part of the same
    /// operation.
    pub fn unbind(&mut self, index: SlotIndex) -> Option<Ownership> {
        self.owners.get_mut(index as usize)?.take()
    }

    /// Hand the block at `index` to `handle`, returning the previous owner.
    ///
    /// # Panics
    ///
    /// Panics if `index` carries no record.
    pub fn rebind(&mut self, index: SlotIndex, handle: HandleId) -> HandleId {
        match self.owners.get_mut(index as usize) {
            Some(Some(ownership)) => std::mem::replace(&mut ownership.handle, handle),
            _ => panic!("index {index} has no owner to transfer from"),
        }
    }

    /// The owner of the block starting at `index`.
    pub fn lookup(&self, index: SlotIndex) -> Option<HandleId> {
        self.get(index).map(|o| o.handle)
    }

    /// The full record at `index`.
    pub fn get(&self, index: SlotIndex) -> Option<Ownership> {
        self.owners.get(index as usize).copied().flatten()
    }

    /// Move the record from `old_index` to `new_index` and tell the owner.
    ///
    /// After this call the owning handle resolves to `new_index`.
    pub fn relocate<B>(&mut self, old_index: SlotIndex, new_index: SlotIndex, handles: &mut B)
    where
        B: HandleBinding + ?Sized,
    {
        let ownership = self.unbind(old_index);
        debug_assert!(ownership.is_some(), "relocating unowned index {old_index}");
        let Some(ownership) = ownership else {
            return;
        };
        self.bind(new_index, ownership.handle, ownership.width);
        handles.notify_relocated(ownership.handle, new_index);
    }

    /// Every recorded block head and its owner, lowest index first.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, Ownership)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.map(|o| (i as SlotIndex, o)))
    }

    /// Drop every record without notifying anyone.
    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleTable;

    fn table_with(n: SlotIndex) -> OwnershipTable {
        let mut t = OwnershipTable::new();
        t.resize(n);
        t
    }

    #[test]
    fn bind_lookup_unbind() {
        let mut handles = HandleTable::new();
        let h = handles.insert();
        let mut t = table_with(4);
        t.bind(2, h, 2);
        assert_eq!(t.lookup(2), Some(h));
        assert_eq!(t.lookup(3), None);
        assert_eq!(t.get(2).map(|o| o.width), Some(2));
        assert_eq!(t.unbind(2).map(|o| o.handle), Some(h));
        assert_eq!(t.lookup(2), None);
    }

    #[test]
    fn relocate_updates_the_handle() {
        let mut handles = HandleTable::new();
        let h = handles.insert();
        handles.bind(h, 3);
        let mut t = table_with(5);
        t.bind(3, h, 2);

        t.relocate(3, 0, &mut handles);

        assert_eq!(t.lookup(0), Some(h));
        assert_eq!(t.lookup(3), None);
        assert_eq!(handles.bound_index(h), Some(0));
    }

    #[test]
    fn rebind_returns_previous_owner() {
        let mut handles = HandleTable::new();
        let a = handles.insert();
        let b = handles.insert();
        let mut t = table_with(1);
        t.bind(0, a, 1);
        assert_eq!(t.rebind(0, b), a);
        assert_eq!(t.lookup(0), Some(b));
        assert_eq!(t.get(0).map(|o| o.width), Some(1));
    }

    #[test]
    #[should_panic(expected = "no owner")]
    fn rebind_of_free_index_panics() {
        let mut handles = HandleTable::new();
        let h = handles.insert();
        let mut t = table_with(2);
        t.rebind(1, h);
    }

    #[test]
    fn iter_lists_heads_in_order() {
        let mut handles = HandleTable::new();
        let a = handles.insert();
        let b = handles.insert();
        let mut t = table_with(6);
        t.bind(4, b, 2);
        t.bind(0, a, 3);
        let heads: Vec<_> = t.iter().map(|(i, o)| (i, o.handle)).collect();
        assert_eq!(heads, vec![(0, a), (4, b)]);
    }
}
