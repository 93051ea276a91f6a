//! Processor core for the Motive slot core.
//!
//! A processor animates many values of one kind and keeps their data in
//! dense arrays. [`ProcessorCore`] owns the bookkeeping for those arrays
//! and reshapes them through the [`SlotStorage`] hooks whenever a block is
//! initialized, removed or relocated. [`Processor`] pairs a core with its
//! storage; [`Motivator`] is the client-side handle to one block.
//!
//! # Lifecycle
//!
//! ```text
//! Free ──initialize_slot──▶ Used(A) ──transfer_slot──▶ Used(B)
//!  ▲                           │  ╲                        │
//!  └────────remove_slot────────┘   defragment (relocate)   │
//!  └───────────────────────remove_slot─────────────────────┘
//! ```
//!
//! All structural operations take `&mut self`; a processor is driven from
//! one thread at a time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod motivator;
pub mod processor;
pub mod slot_core;
pub mod storage;
pub mod verify;

pub use motivator::Motivator;
pub use processor::{FrameProcessor, Processor};
pub use slot_core::ProcessorCore;
pub use storage::{Animator, SlotStorage};
pub use verify::check_table_len;
