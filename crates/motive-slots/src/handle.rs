//! Generational table of handles owned by one processor.
//!
//! Client handles never hold pointers into a processor. Each processor
//! keeps a [`HandleTable`] and hands out [`HandleId`]s; the table entry is
//! the handle's authoritative record of which index it is bound to. When
//! the slot core relocates or invalidates a block it updates the entry
//! through [`HandleBinding`], and the client sees the new state the next
//! time it resolves its id.

use motive_core::{HandleBinding, HandleId, SlotIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryState {
    Vacant,
    Unbound,
    Bound(SlotIndex),
}

#[derive(Clone, Copy, Debug)]
struct HandleEntry {
    generation: u32,
    state: EntryState,
}

/// Arena of handle records with free-list reuse.
///
/// Removing an entry bumps its generation, so ids issued before the
/// removal stop resolving even after the entry is recycled.
#[derive(Clone, Debug, Default)]
pub struct HandleTable {
    entries: Vec<HandleEntry>,
    free_list: Vec<u32>,
    live: usize,
}

impl HandleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` handles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Register a new, unbound handle.
    pub fn insert(&mut self) -> HandleId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let entry = &mut self.entries[index as usize];
            entry.state = EntryState::Unbound;
            return HandleId::new(index, entry.generation);
        }
        let index = self.entries.len() as u32;
        self.entries.push(HandleEntry {
            generation: 0,
            state: EntryState::Unbound,
        });
        HandleId::new(index, 0)
    }

    /// Retire a handle. Returns `false` if `handle` was already stale.
    ///
    /// # Panics
    ///
    /// Panics if the handle is still bound; its block must be removed or
    /// transferred first.
    pub fn remove(&mut self, handle: HandleId) -> bool {
        let Some(entry) = self.entry_mut(handle) else {
            return false;
        };
        assert!(
            !matches!(entry.state, EntryState::Bound(_)),
            "handle {handle} removed while still bound"
        );
        entry.state = EntryState::Vacant;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        true
    }

    /// Bind an unbound handle to the block at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or already bound.
    pub fn bind(&mut self, handle: HandleId, index: SlotIndex) {
        match self.entry_mut(handle) {
            Some(entry) if entry.state == EntryState::Unbound => {
                entry.state = EntryState::Bound(index);
            }
            _ => panic!("handle {handle} cannot be bound to {index}: stale or already bound"),
        }
    }

    /// Whether `handle` refers to a live entry (bound or not).
    pub fn contains(&self, handle: HandleId) -> bool {
        self.entry(handle).is_some()
    }

    /// Whether `handle` is live and bound to a block.
    pub fn is_bound(&self, handle: HandleId) -> bool {
        self.bound_index(handle).is_some()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether there are no live handles.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// All bound handles and their indices.
    pub fn bound(&self) -> impl Iterator<Item = (HandleId, SlotIndex)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry.state {
                EntryState::Bound(index) => {
                    Some((HandleId::new(i as u32, entry.generation), index))
                }
                _ => None,
            })
    }

    /// Unbind every handle without retiring any of them.
    pub fn invalidate_all(&mut self) {
        for entry in &mut self.entries {
            if let EntryState::Bound(_) = entry.state {
                entry.state = EntryState::Unbound;
            }
        }
    }

    fn entry(&self, handle: HandleId) -> Option<&HandleEntry> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation && e.state != EntryState::Vacant)
    }

    fn entry_mut(&mut self, handle: HandleId) -> Option<&mut HandleEntry> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|e| e.generation == handle.generation && e.state != EntryState::Vacant)
    }
}

impl HandleBinding for HandleTable {
    fn notify_relocated(&mut self, handle: HandleId, new_index: SlotIndex) {
        if let Some(entry) = self.entry_mut(handle) {
            debug_assert!(
                matches!(entry.state, EntryState::Bound(_)),
                "relocated handle {handle} is not bound"
            );
            entry.state = EntryState::Bound(new_index);
        }
    }

    fn notify_invalidated(&mut self, handle: HandleId) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.state = EntryState::Unbound;
        }
    }

    fn bound_index(&self, handle: HandleId) -> Option<SlotIndex> {
        match self.entry(handle)?.state {
            EntryState::Bound(index) => Some(index),
            _ => None,
        }
    }
}
