//! Slot allocator configuration.

use motive_core::{SlotError, SlotIndex};

/// Configuration for a processor's slot bookkeeping.
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotConfig {
    /// Number of indices to reserve memory for up front.
    ///
    /// Only affects `Vec` capacity; `num_indices` always starts at zero.
    /// Default: 64.
    pub initial_capacity: SlotIndex,

    /// Hard upper bound on `num_indices`.
    ///
    /// An allocation that would grow past this bound fails with
    /// [`SlotError::CapacityExceeded`]. Default: 2^24.
    pub max_indices: SlotIndex,
}

impl SlotConfig {
    /// Default up-front reservation.
    pub const DEFAULT_INITIAL_CAPACITY: SlotIndex = 64;

    /// Default upper bound on the number of indices.
    pub const DEFAULT_MAX_INDICES: SlotIndex = 1 << 24;

    /// Create a config with the given maximum and default reservation.
    pub fn new(max_indices: SlotIndex) -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY.min(max_indices),
            max_indices,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), SlotError> {
        if self.max_indices == 0 {
            return Err(SlotError::InvalidConfig {
                reason: "max_indices must be at least 1".to_string(),
            });
        }
        if self.initial_capacity > self.max_indices {
            return Err(SlotError::InvalidConfig {
                reason: format!(
                    "initial_capacity {} exceeds max_indices {}",
                    self.initial_capacity, self.max_indices
                ),
            });
        }
        Ok(())
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_INDICES)
    }
}
