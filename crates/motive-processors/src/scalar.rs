//! Array-backed scalar processor with constant-rate target approach.
//!
//! Each index holds one `f32` channel. A block of width 3 is a 3D value
//! whose components move independently. Every frame each channel moves
//! towards its target by at most `speed * delta_time` and stops exactly on
//! it.

use motive_core::{Dimension, MotiveTime, ProcessorKind, SlotIndex, VerifyError};
use motive_processor::{check_table_len, Animator, ProcessorCore, SlotStorage};
use smallvec::SmallVec;
use tracing::trace;

/// Initial state of a scalar block.
///
/// `values` and `targets` are read per channel. A list shorter than the
/// block repeats its last entry; an empty list means 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarInit {
    /// Starting value per channel.
    pub values: SmallVec<[f32; 4]>,
    /// Target per channel.
    pub targets: SmallVec<[f32; 4]>,
    /// Units per time unit. Zero holds the starting value.
    pub speed: f32,
}

impl ScalarInit {
    /// Per-channel start and target values.
    pub fn new(values: &[f32], targets: &[f32], speed: f32) -> Self {
        Self {
            values: SmallVec::from_slice(values),
            targets: SmallVec::from_slice(targets),
            speed,
        }
    }

    /// The same start and target on every channel.
    pub fn uniform(value: f32, target: f32, speed: f32) -> Self {
        Self::new(&[value], &[target], speed)
    }

    fn channel(list: &[f32], i: usize) -> f32 {
        list.get(i).or(list.last()).copied().unwrap_or(0.0)
    }
}

/// Storage for scalar channels.
#[derive(Clone, Debug, Default)]
pub struct ScalarProcessor {
    values: Vec<f32>,
    velocities: Vec<f32>,
    targets: Vec<f32>,
    speeds: Vec<f32>,
}

impl ScalarProcessor {
    /// Processor type name.
    pub const KIND: ProcessorKind = ProcessorKind("scalar");

    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values of `[index, index + width)`.
    pub fn values(&self, index: SlotIndex, width: Dimension) -> &[f32] {
        &self.values[range(index, width)]
    }

    /// Current value of one channel.
    pub fn value(&self, index: SlotIndex) -> f32 {
        self.values[index as usize]
    }

    /// Signed velocities of `[index, index + width)`; 0 once on target.
    pub fn velocities(&self, index: SlotIndex, width: Dimension) -> &[f32] {
        &self.velocities[range(index, width)]
    }

    /// Targets of `[index, index + width)`.
    pub fn target_values(&self, index: SlotIndex, width: Dimension) -> &[f32] {
        &self.targets[range(index, width)]
    }

    /// Target minus current value of one channel.
    pub fn difference(&self, index: SlotIndex) -> f32 {
        let i = index as usize;
        self.targets[i] - self.values[i]
    }

    /// Time until every channel of the block reaches its target.
    ///
    /// Channels with zero speed that are off target never arrive and are
    /// reported as [`MotiveTime::MAX`].
    pub fn time_to_target(&self, index: SlotIndex, width: Dimension) -> MotiveTime {
        range(index, width)
            .map(|i| {
                let distance = (self.targets[i] - self.values[i]).abs();
                if distance == 0.0 {
                    0
                } else if self.speeds[i] <= 0.0 {
                    MotiveTime::MAX
                } else {
                    (distance / self.speeds[i]).ceil() as MotiveTime
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Retarget the block starting at `index`, one target per channel.
    pub fn set_targets(&mut self, index: SlotIndex, targets: &[f32]) {
        let start = index as usize;
        self.targets[start..start + targets.len()].copy_from_slice(targets);
        trace!(index, width = targets.len(), "retargeted scalar block");
    }

    /// Change the approach speed of `[index, index + width)`.
    pub fn set_speed(&mut self, index: SlotIndex, width: Dimension, speed: f32) {
        self.speeds[range(index, width)].fill(speed);
    }

    fn step(&mut self, i: usize, delta_time: MotiveTime) {
        let diff = self.targets[i] - self.values[i];
        let max_step = self.speeds[i] * delta_time as f32;
        if diff.abs() <= max_step {
            self.values[i] = self.targets[i];
            self.velocities[i] = 0.0;
        } else if max_step > 0.0 {
            self.values[i] += max_step.copysign(diff);
            self.velocities[i] = self.speeds[i].copysign(diff);
        }
    }
}

fn range(index: SlotIndex, width: Dimension) -> std::ops::Range<usize> {
    let start = index as usize;
    start..start + width as usize
}

impl SlotStorage for ScalarProcessor {
    type Init = ScalarInit;

    fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &ScalarInit) {
        for (channel, i) in range(index, width).enumerate() {
            self.values[i] = ScalarInit::channel(&init.values, channel);
            self.targets[i] = ScalarInit::channel(&init.targets, channel);
            self.velocities[i] = 0.0;
            self.speeds[i] = init.speed;
        }
    }

    fn remove_indices(&mut self, index: SlotIndex, width: Dimension) {
        let cells = range(index, width);
        self.values[cells.clone()].fill(0.0);
        self.velocities[cells.clone()].fill(0.0);
        self.targets[cells.clone()].fill(0.0);
        self.speeds[cells].fill(0.0);
    }

    fn move_indices(&mut self, old_index: SlotIndex, new_index: SlotIndex, width: Dimension) {
        let source = range(old_index, width);
        let dest = new_index as usize;
        self.values.copy_within(source.clone(), dest);
        self.velocities.copy_within(source.clone(), dest);
        self.targets.copy_within(source.clone(), dest);
        self.speeds.copy_within(source, dest);
    }

    fn set_num_indices(&mut self, num_indices: SlotIndex) {
        let n = num_indices as usize;
        self.values.resize(n, 0.0);
        self.velocities.resize(n, 0.0);
        self.targets.resize(n, 0.0);
        self.speeds.resize(n, 0.0);
    }

    fn verify_storage(&self, num_indices: SlotIndex) -> Result<(), VerifyError> {
        check_table_len("values", self.values.len(), num_indices)?;
        check_table_len("velocities", self.velocities.len(), num_indices)?;
        check_table_len("targets", self.targets.len(), num_indices)?;
        check_table_len("speeds", self.speeds.len(), num_indices)
    }
}

impl Animator for ScalarProcessor {
    fn kind(&self) -> ProcessorKind {
        Self::KIND
    }

    fn priority(&self) -> i32 {
        0
    }

    fn advance_frame(&mut self, delta_time: MotiveTime, slots: &ProcessorCore) {
        for block in slots.blocks() {
            for i in block.start..block.end() {
                self.step(i as usize, delta_time);
            }
        }
    }
}
