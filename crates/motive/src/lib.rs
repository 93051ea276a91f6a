//! Motive: pooled slot allocation for animation processors.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Motive sub-crates. For most users, adding `motive` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use motive::prelude::*;
//!
//! let mut scalars = Processor::new(ScalarProcessor::new());
//!
//! // A 3D position easing towards (1, 2, 3).
//! let mut position = Motivator::new();
//! position
//!     .initialize(&mut scalars, &ScalarInit::new(&[0.0], &[1.0, 2.0, 3.0], 0.5), 3)
//!     .unwrap();
//!
//! scalars.advance_frame(2);
//!
//! let index = position.index(&scalars).unwrap();
//! assert_eq!(scalars.storage().values(index, 3), &[1.0, 1.0, 1.0]);
//!
//! position.invalidate(&mut scalars).unwrap();
//! assert!(!position.is_valid(&scalars));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `motive-core` | Ids, index aliases, errors, `HandleBinding` |
//! | [`slots`] | `motive-slots` | Index allocator, defrag ledger, ownership and handle tables |
//! | [`processor`] | `motive-processor` | Processor core, storage hooks, motivators |
//! | [`processors`] | `motive-processors` | Reference scalar and rig processors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, ids and errors (`motive-core`).
pub use motive_core as types;

/// Slot bookkeeping (`motive-slots`).
///
/// [`slots::IndexAllocator`] and [`slots::DefragPlan`] are useful on their
/// own for any pool of variable-width blocks.
pub use motive_slots as slots;

/// Processor core, storage hooks and motivators (`motive-processor`).
pub use motive_processor as processor;

/// Reference processors (`motive-processors`).
pub use motive_processors as processors;

/// Common imports for typical Motive usage.
///
/// ```rust
/// use motive::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use motive_core::{Dimension, HandleId, MotiveTime, ProcessorId, ProcessorKind, SlotIndex};

    // Errors
    pub use motive_core::{SlotError, VerifyError};

    // Slots
    pub use motive_slots::{DefragPlan, SlotConfig, SlotStats};

    // Processor
    pub use motive_processor::{Animator, FrameProcessor, Motivator, Processor, SlotStorage};

    // Reference processors
    pub use motive_processors::{RigInit, RigProcessor, ScalarInit, ScalarProcessor};
}
