//! Bow: the head dips down and toward the camera in two steps.

use tracing::{debug, trace};

use super::session::JointBuffer;
use crate::geometry::{joint_distance, planar_distance};
use crate::skeleton::{Joint, JointId, SkeletonFrame};

/// Thresholds for bow recognition (millimeters).
#[derive(Debug, Clone, PartialEq)]
pub struct BowConfig {
    /// Head travel below which a frame is ignored as jitter.
    pub min_movement_mm: f32,
    /// Forward travel required for a bowing step.
    pub min_forward_mm: i32,
    /// Sideways/vertical drift, or backward travel, that drops the
    /// current reference.
    pub max_drift_mm: f32,
}

impl Default for BowConfig {
    fn default() -> Self {
        Self {
            min_movement_mm: 100.0,
            min_forward_mm: 100,
            max_drift_mm: 150.0,
        }
    }
}

/// Position in the bow sequence; the index is the buffer slot holding
/// the phase's reference head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BowPhase {
    Upright,
    Lowering,
}

impl BowPhase {
    pub fn index(self) -> usize {
        match self {
            Self::Upright => 0,
            Self::Lowering => 1,
        }
    }
}

/// Outcome of comparing the current head with the phase reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BowStep {
    /// No reference yet: capture this head.
    Anchor,
    /// Moved too little, or in no meaningful direction.
    Hold,
    /// Head dipped down and forward.
    Advance,
    /// Head wandered off; forget this phase's reference.
    DropReference,
}

const HEAD_SLOTS: usize = 3;

/// Bow classifier state.  The third head capture completes the bow, so
/// the last slot is never held across frames.
#[derive(Debug, Clone)]
pub struct BowTracker {
    phase: BowPhase,
    heads: JointBuffer<HEAD_SLOTS>,
}

impl Default for BowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BowTracker {
    pub const CAPACITY: usize = HEAD_SLOTS;

    pub fn new() -> Self {
        Self {
            phase: BowPhase::Upright,
            heads: JointBuffer::new(),
        }
    }

    /// Forget every captured head.
    pub fn clear(&mut self) {
        self.phase = BowPhase::Upright;
        self.heads.clear();
    }

    pub fn phase(&self) -> BowPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.phase.index()
    }

    pub fn captured(&self) -> usize {
        self.heads.len()
    }

    fn step(previous: Option<Joint>, head: &Joint, config: &BowConfig) -> BowStep {
        let Some(previous) = previous else {
            return BowStep::Anchor;
        };

        if joint_distance(&previous, head) < config.min_movement_mm {
            return BowStep::Hold;
        }

        let forward = previous.z - head.z;
        if forward > config.min_forward_mm && previous.screen_y < head.screen_y {
            BowStep::Advance
        } else if planar_distance(&previous, head) > config.max_drift_mm
            || -forward > config.max_drift_mm as i32
        {
            BowStep::DropReference
        } else {
            BowStep::Hold
        }
    }

    /// Process one frame.  Returns true when the bow is complete; the
    /// tracker is already cleared by then.
    pub fn update(&mut self, frame: &SkeletonFrame, config: &BowConfig) -> bool {
        let Some(head) = frame.get(JointId::Head) else {
            trace!("bow: head not tracked, skipping frame");
            return false;
        };

        let slot = self.phase.index();
        match Self::step(self.heads.get(slot), &head, config) {
            BowStep::Anchor => {
                self.heads.set(slot, head);
                debug!(cursor = slot, "bow: reference captured");
            }
            BowStep::Hold => {}
            BowStep::DropReference => {
                self.heads.take(slot);
                debug!(cursor = slot, "bow: head drifted, reference dropped");
            }
            BowStep::Advance => match self.phase {
                BowPhase::Upright => {
                    self.phase = BowPhase::Lowering;
                    self.heads.set(BowPhase::Lowering.index(), head);
                    debug!(cursor = self.phase.index(), "bow: head lowering");
                }
                BowPhase::Lowering => {
                    debug!("bow: complete");
                    self.clear();
                    return true;
                }
            },
        }
        false
    }
}

#[cfg(test)]
fn head_frame(x: i32, y: i32, z: i32, screen_y: i32) -> SkeletonFrame {
    SkeletonFrame::new().with(JointId::Head, Joint::new(x, y, z, 320, screen_y))
}
