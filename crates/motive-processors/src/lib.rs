//! Reference processors for the Motive slot core.
//!
//! Two storage layouts that exercise every hook of
//! [`SlotStorage`](motive_processor::SlotStorage):
//!
//! - [`ScalarProcessor`]: plain `f32` arrays, one channel per index, moved
//!   with `copy_within`.
//! - [`RigProcessor`]: one rig per index, each owning a bone transform
//!   buffer that is handed over on relocation and dropped on removal.
//!
//! # Frame order
//!
//! 1. [`ScalarProcessor`]: priority 0
//! 2. [`RigProcessor`]: priority 1

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod rig;
pub mod scalar;

pub use rig::{AffineTransform, RigInit, RigProcessor, IDENTITY};
pub use scalar::{ScalarInit, ScalarProcessor};
