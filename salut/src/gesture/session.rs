//! Fixed-capacity joint storage for the temporal classifiers.
//!
//! Each temporal classifier owns one `JointBuffer` whose capacity is a
//! compile-time constant of that gesture.  Slots hold copies of joints;
//! nothing in a buffer refers back into the frame it came from.

use crate::skeleton::Joint;

/// Slot-addressed joint snapshots with a fixed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct JointBuffer<const N: usize> {
    slots: [Option<Joint>; N],
}

impl<const N: usize> Default for JointBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> JointBuffer<N> {
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Number of slots; fixed for the buffer's lifetime.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Copy of the joint in `slot`, if captured.
    pub fn get(&self, slot: usize) -> Option<Joint> {
        self.slots.get(slot).copied().flatten()
    }

    /// Capture a joint.  Writes past the capacity are ignored.
    pub fn set(&mut self, slot: usize, joint: Joint) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Some(joint);
        }
    }

    /// Release a slot, returning what it held.
    pub fn take(&mut self, slot: usize) -> Option<Joint> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        self.slots = [None; N];
    }

    /// Number of captured joints.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
