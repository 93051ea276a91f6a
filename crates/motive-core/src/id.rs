//! Strongly-typed identifiers and index aliases.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Position of a cell in a processor's backing arrays.
///
/// A slot index usually names the *first* cell of a block; the remaining
/// cells of the block are addressed as `index + 1 .. index + width`.
pub type SlotIndex = u32;

/// Number of contiguous slots a block occupies.
///
/// A 3D position driven by a scalar processor occupies three slots; a
/// whole rig occupies one slot in a rig processor.
pub type Dimension = u32;

/// Animation time, in caller-defined units (usually milliseconds).
pub type MotiveTime = i32;

/// Identifies an entry in a processor's handle table.
///
/// Handles are arena indices with a generation counter. When a handle entry
/// is released its generation is bumped, so an old `HandleId` that happens
/// to share the same `index` with a recycled entry resolves to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    /// Position in the handle table.
    pub index: u32,
    /// Generation of the entry when this id was issued.
    pub generation: u32,
}

impl HandleId {
    /// Create a handle id from its raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Counter for unique [`ProcessorId`] allocation.
static PROCESSOR_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a processor.
///
/// Allocated from a monotonic atomic counter via [`ProcessorId::next`].
/// Motivators record the id of the processor they were initialized
/// against, so a motivator can never be resolved against a different
/// processor that happens to have a slot at the same index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorId(u64);

impl ProcessorId {
    /// Allocate a fresh, unique processor id. Thread-safe.
    pub fn next() -> Self {
        Self(PROCESSOR_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a processor type ("scalar", "rig", ...).
///
/// An external registry maps a kind to a factory; the slot core only needs
/// the kind for diagnostics and for schedulers that order processors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorKind(pub &'static str);

impl ProcessorKind {
    /// The kind's name.
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
