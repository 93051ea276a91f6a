//! One slot per rig, each with its own bone transform buffer.
//!
//! Unlike [`ScalarProcessor`](crate::ScalarProcessor), the per-slot data
//! here owns heap memory. `remove_indices` and shrinking through
//! `set_num_indices` drop it, and moves hand the buffer over rather than
//! copying it.

use motive_core::{Dimension, MotiveTime, ProcessorKind, SlotIndex, VerifyError};
use motive_processor::{check_table_len, Animator, ProcessorCore, SlotStorage};
use tracing::trace;

/// Row-major 3x4 affine transform.
pub type AffineTransform = [f32; 12];

/// The identity transform.
pub const IDENTITY: AffineTransform = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0,
];

/// Initial state of a rig.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigInit {
    /// Number of bones; each starts at [`IDENTITY`].
    pub num_bones: usize,
    /// Length of the animation the rig starts playing.
    pub duration: MotiveTime,
    /// Playback speed multiplier.
    pub playback_rate: f32,
}

impl RigInit {
    /// A rig of `num_bones` playing an animation of `duration` at normal
    /// speed.
    pub fn new(num_bones: usize, duration: MotiveTime) -> Self {
        Self {
            num_bones,
            duration,
            playback_rate: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct RigState {
    global_transforms: Vec<AffineTransform>,
    time_remaining: MotiveTime,
    playback_rate: f32,
}

impl RigState {
    fn new(init: &RigInit) -> Self {
        Self {
            global_transforms: vec![IDENTITY; init.num_bones],
            time_remaining: init.duration,
            playback_rate: init.playback_rate,
        }
    }

    fn advance(&mut self, delta_time: MotiveTime) {
        let elapsed = (delta_time as f32 * self.playback_rate).round() as MotiveTime;
        self.time_remaining = (self.time_remaining - elapsed).max(0);
    }
}

/// Storage for rigs. `None` marks a free index.
#[derive(Clone, Debug, Default)]
pub struct RigProcessor {
    rigs: Vec<Option<RigState>>,
}

impl RigProcessor {
    /// Processor type name.
    pub const KIND: ProcessorKind = ProcessorKind("rig");

    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn rig(&self, index: SlotIndex) -> Option<&RigState> {
        self.rigs.get(index as usize)?.as_ref()
    }

    fn rig_mut(&mut self, index: SlotIndex) -> Option<&mut RigState> {
        self.rigs.get_mut(index as usize)?.as_mut()
    }

    /// Bone transforms of the rig at `index`; empty for a free index.
    pub fn global_transforms(&self, index: SlotIndex) -> &[AffineTransform] {
        self.rig(index)
            .map(|rig| rig.global_transforms.as_slice())
            .unwrap_or_default()
    }

    /// Number of bones of the rig at `index`.
    pub fn num_bones(&self, index: SlotIndex) -> usize {
        self.global_transforms(index).len()
    }

    /// Time left in the current animation; 0 for a free index.
    pub fn time_remaining(&self, index: SlotIndex) -> MotiveTime {
        self.rig(index).map_or(0, |rig| rig.time_remaining)
    }

    /// Overwrite one bone's transform.
    ///
    /// # Panics
    ///
    /// Panics if `index` holds no rig or `bone` is out of range.
    pub fn set_bone_transform(
        &mut self,
        index: SlotIndex,
        bone: usize,
        transform: AffineTransform,
    ) {
        match self.rig_mut(index) {
            Some(rig) => rig.global_transforms[bone] = transform,
            None => panic!("set_bone_transform({index}): no rig at this index"),
        }
    }

    /// Restart the rig at `index` on an animation of `duration`.
    pub fn blend_to_anim(&mut self, index: SlotIndex, duration: MotiveTime) {
        if let Some(rig) = self.rig_mut(index) {
            rig.time_remaining = duration;
            trace!(index, duration, "rig blending to new animation");
        }
    }

    /// Change the playback speed of the rig at `index`.
    pub fn set_playback_rate(&mut self, index: SlotIndex, playback_rate: f32) {
        if let Some(rig) = self.rig_mut(index) {
            rig.playback_rate = playback_rate;
        }
    }

    /// Number of indices holding a rig.
    pub fn live_rigs(&self) -> usize {
        self.rigs.iter().filter(|rig| rig.is_some()).count()
    }
}

impl SlotStorage for RigProcessor {
    type Init = RigInit;

    fn initialize_indices(&mut self, index: SlotIndex, width: Dimension, init: &RigInit) {
        let start = index as usize;
        for slot in &mut self.rigs[start..start + width as usize] {
            *slot = Some(RigState::new(init));
        }
    }

    fn remove_indices(&mut self, index: SlotIndex, width: Dimension) {
        let start = index as usize;
        for slot in &mut self.rigs[start..start + width as usize] {
            *slot = None;
        }
    }

    fn move_indices(&mut self, old_index: SlotIndex, new_index: SlotIndex, width: Dimension) {
        // Ascending order is overlap-safe because new_index < old_index.
        for offset in 0..width as usize {
            let rig = self.rigs[old_index as usize + offset].take();
            self.rigs[new_index as usize + offset] = rig;
        }
    }

    fn set_num_indices(&mut self, num_indices: SlotIndex) {
        self.rigs.resize_with(num_indices as usize, || None);
    }

    fn verify_storage(&self, num_indices: SlotIndex) -> Result<(), VerifyError> {
        check_table_len("rigs", self.rigs.len(), num_indices)
    }
}

impl Animator for RigProcessor {
    fn kind(&self) -> ProcessorKind {
        Self::KIND
    }

    /// Rigs sample scalar channels, so they run after them.
    fn priority(&self) -> i32 {
        1
    }

    fn advance_frame(&mut self, delta_time: MotiveTime, slots: &ProcessorCore) {
        for block in slots.blocks() {
            for index in block.start..block.end() {
                if let Some(rig) = self.rig_mut(index) {
                    rig.advance(delta_time);
                }
            }
        }
    }
}
