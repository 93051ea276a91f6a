//! Debug-time consistency check across allocator, owners and handles.

use std::collections::HashMap;

use motive_core::{HandleBinding, HandleId, SlotIndex, VerifyError};
use tracing::warn;

use crate::slot_core::ProcessorCore;

impl ProcessorCore {
    /// Check that the allocator, ownership table and handle table agree.
    ///
    /// Verifies, in order: the allocator's own structure, the ownership
    /// table length, that every used block head has an owner and nothing
    /// else does, that each owner resolves back to its block, that no handle
    /// owns two blocks, and that the width recorded at initialization still
    /// matches the allocator. `num_indices` of the storage arrays is the
    /// caller's responsibility; see [`check_table_len`].
    ///
    /// # Errors
    ///
    /// The first inconsistency found.
    pub fn verify_internal_state(&self) -> Result<(), VerifyError> {
        let result = self.check();
        if let Err(err) = &result {
            warn!(processor = %self.id(), error = %err, "slot state inconsistent");
        }
        result
    }

    fn check(&self) -> Result<(), VerifyError> {
        self.allocator.verify()?;
        let num_indices = self.num_indices();
        check_table_len("ownership", self.owners.len(), num_indices)?;

        let mut seen: HashMap<HandleId, SlotIndex> = HashMap::new();
        for (index, ownership) in self.owners.iter() {
            let width = self.allocator.count_for_index(index);
            if width == 0 {
                return Err(VerifyError::StrayOwner {
                    index,
                    handle: ownership.handle,
                });
            }
            if width != ownership.width {
                return Err(VerifyError::WidthMismatch {
                    index,
                    allocator: width,
                    recorded: ownership.width,
                });
            }
            let bound = self.handles.bound_index(ownership.handle);
            if bound != Some(index) {
                return Err(VerifyError::OwnerMismatch {
                    index,
                    handle: ownership.handle,
                    bound,
                });
            }
            if let Some(first) = seen.insert(ownership.handle, index) {
                return Err(VerifyError::DuplicateOwner {
                    handle: ownership.handle,
                    first,
                    second: index,
                });
            }
        }

        for block in self.allocator.used_blocks() {
            if self.owners.lookup(block.start).is_none() {
                return Err(VerifyError::MissingOwner { index: block.start });
            }
        }

        // A handle bound to a block it does not own.
        for (handle, index) in self.handles.bound() {
            if self.owners.lookup(index) != Some(handle) {
                return Err(VerifyError::OwnerMismatch {
                    index,
                    handle,
                    bound: Some(index),
                });
            }
        }
        Ok(())
    }
}

/// Check that a per-index table is exactly `num_indices` long.
///
/// Processors call this from their own verification for each backing
/// array they keep.
///
/// # Errors
///
/// [`VerifyError::TableLength`] naming `table` on mismatch.
pub fn check_table_len(
    table: &'static str,
    len: usize,
    num_indices: SlotIndex,
) -> Result<(), VerifyError> {
    if len == num_indices as usize {
        Ok(())
    } else {
        Err(VerifyError::TableLength {
            table,
            len,
            num_indices,
        })
    }
}
