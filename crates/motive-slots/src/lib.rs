//! Slot bookkeeping for pooled processors.
//!
//! A processor keeps the data for all of its motivators in dense arrays.
//! This crate owns everything about *which* cells of those arrays are in
//! use, and by whom, without ever seeing the arrays themselves.
//!
//! # Architecture
//!
//! ```text
//! ProcessorCore (motive-processor)
//! ├── IndexAllocator      used / interior / free state per index
//! │   ├── free ranges     by address and by length, merged on release
//! │   └── DefragPlan      pure move ledger, applied through callbacks
//! ├── OwnershipTable      block head → owning HandleId (+ recorded width)
//! └── HandleTable         HandleId → bound index (generational arena)
//! ```
//!
//! Storage is reshaped only through [`AllocatorCallbacks`]: the allocator
//! calls `set_num_indices` when the arrays must grow or shrink and
//! `move_index_range` for every block it relocates while compacting.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod config;
pub mod defrag;
mod free;
pub mod handle;
pub mod ownership;

pub use allocator::{AllocatorCallbacks, IndexAllocator, IndexRange, SlotStats};
pub use config::SlotConfig;
pub use defrag::{DefragPlan, Relocation};
pub use handle::HandleTable;
pub use ownership::{Ownership, OwnershipTable};
