//! Core types and traits for the Motive slot core.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the allocator, the processor core and the
//! reference processors: slot and handle identifiers, error types, and the
//! [`HandleBinding`] notification contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{SlotError, VerifyError};
pub use id::{Dimension, HandleId, MotiveTime, ProcessorId, ProcessorKind, SlotIndex};
pub use traits::HandleBinding;
