//! Error types for the Motive slot core.
//!
//! Two families: [`SlotError`] for recoverable failures of lifecycle
//! operations (capacity, stale or foreign handles, bad configuration),
//! and [`VerifyError`] for inconsistencies found by the debug-time
//! internal state check. Caller-contract violations are not represented
//! here: they panic at the call site.

use std::error::Error;
use std::fmt;

use crate::id::{Dimension, HandleId, ProcessorId, SlotIndex};

/// Recoverable failures of slot lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotError {
    /// Growing the backing arrays would exceed the configured maximum.
    ///
    /// The allocator, ownership table and storage are left unchanged.
    CapacityExceeded {
        /// Width of the block that was requested.
        requested: Dimension,
        /// Number of indices at the time of the request.
        num_indices: SlotIndex,
        /// Configured upper bound on the number of indices.
        max_indices: SlotIndex,
    },
    /// The motivator or handle is not bound to any block.
    InvalidHandle {
        /// The handle, if the motivator had one.
        handle: Option<HandleId>,
    },
    /// A motivator was used with a processor it was not initialized on.
    WrongProcessor {
        /// The processor the motivator is bound to.
        expected: ProcessorId,
        /// The processor the operation was attempted on.
        found: ProcessorId,
    },
    /// A `SlotConfig` value failed validation.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                num_indices,
                max_indices,
            } => write!(
                f,
                "slot capacity exceeded: requested {requested} slots with {num_indices} in use, maximum {max_indices}"
            ),
            Self::InvalidHandle { handle: Some(h) } => {
                write!(f, "handle {h} is not bound to a slot")
            }
            Self::InvalidHandle { handle: None } => write!(f, "motivator is not initialized"),
            Self::WrongProcessor { expected, found } => write!(
                f,
                "motivator belongs to processor {expected}, not processor {found}"
            ),
            Self::InvalidConfig { reason } => write!(f, "invalid slot config: {reason}"),
        }
    }
}

impl Error for SlotError {}

/// Inconsistencies detected by `verify_internal_state`.
///
/// Any of these indicates a bug in the slot core or in code that bypassed
/// its API; they are reported rather than panicking so that a debugging
/// session can print every problem it finds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// Free widths plus used widths do not add up to `num_indices`.
    Accounting {
        /// Sum of used block widths.
        used: SlotIndex,
        /// Sum of free range widths.
        free: SlotIndex,
        /// Total number of indices.
        num_indices: SlotIndex,
    },
    /// Two free ranges touch and should have been merged.
    UnmergedFreeRanges {
        /// Start of the lower range.
        first: SlotIndex,
        /// Start of the upper range.
        second: SlotIndex,
    },
    /// A block's interior cells are missing, or an interior cell has no
    /// block head before it.
    BrokenBlock {
        /// The first index where the layout stops making sense.
        index: SlotIndex,
    },
    /// A free range disagrees with the per-index state.
    FreeRangeMismatch {
        /// First index of the offending range.
        start: SlotIndex,
    },
    /// A used block head has no owning handle.
    MissingOwner {
        /// The block head.
        index: SlotIndex,
    },
    /// An ownership record sits on an index that is not a used block head.
    StrayOwner {
        /// The index carrying the stray record.
        index: SlotIndex,
        /// The handle recorded there.
        handle: HandleId,
    },
    /// A block's owner does not point back at the block.
    OwnerMismatch {
        /// The block head.
        index: SlotIndex,
        /// The handle recorded as owner.
        handle: HandleId,
        /// Where the handle thinks it is bound.
        bound: Option<SlotIndex>,
    },
    /// One handle owns more than one block.
    DuplicateOwner {
        /// The handle.
        handle: HandleId,
        /// First block owned.
        first: SlotIndex,
        /// Second block owned.
        second: SlotIndex,
    },
    /// The allocator's block width differs from the width recorded when
    /// the block was initialized.
    WidthMismatch {
        /// The block head.
        index: SlotIndex,
        /// Width according to the allocator.
        allocator: Dimension,
        /// Width recorded at initialization.
        recorded: Dimension,
    },
    /// A bookkeeping table is not sized to `num_indices`.
    TableLength {
        /// Which table.
        table: &'static str,
        /// Its length.
        len: usize,
        /// Expected length.
        num_indices: SlotIndex,
    },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accounting {
                used,
                free,
                num_indices,
            } => write!(
                f,
                "used ({used}) + free ({free}) slots do not add up to {num_indices}"
            ),
            Self::UnmergedFreeRanges { first, second } => {
                write!(f, "free ranges at {first} and {second} are adjacent")
            }
            Self::BrokenBlock { index } => write!(f, "block layout is broken at index {index}"),
            Self::FreeRangeMismatch { start } => {
                write!(f, "free range at {start} covers indices that are not free")
            }
            Self::MissingOwner { index } => write!(f, "block at {index} has no owner"),
            Self::StrayOwner { index, handle } => {
                write!(f, "handle {handle} recorded at {index}, which is not a block head")
            }
            Self::OwnerMismatch {
                index,
                handle,
                bound,
            } => match bound {
                Some(b) => write!(f, "block at {index} is owned by {handle}, which is bound to {b}"),
                None => write!(f, "block at {index} is owned by {handle}, which is unbound"),
            },
            Self::DuplicateOwner {
                handle,
                first,
                second,
            } => write!(f, "handle {handle} owns both {first} and {second}"),
            Self::WidthMismatch {
                index,
                allocator,
                recorded,
            } => write!(
                f,
                "block at {index} has width {allocator}, but {recorded} was recorded at initialization"
            ),
            Self::TableLength {
                table,
                len,
                num_indices,
            } => write!(f, "{table} has {len} entries, expected {num_indices}"),
        }
    }
}

impl Error for VerifyError {}
