//! Curtsy: hands held low at the sides while the head dips and rises
//! at a constant distance from the camera.

use tracing::{debug, trace};

use super::session::JointBuffer;
use crate::geometry::joint_distance;
use crate::skeleton::{Joint, JointId, SkeletonFrame};

#[derive(Debug, Clone, PartialEq)]
pub struct CurtsyConfig {
    /// Head travel below which a frame is ignored.
    pub min_movement_mm: f32,
    /// Depth change allowed during a dip or a rise.
    pub max_depth_change_mm: i32,
    /// Height change a dip or a rise must exceed.
    pub min_height_change_mm: i32,
    /// Require both hands below the head and outside the elbows.
    pub hands_gate: bool,
}

impl Default for CurtsyConfig {
    fn default() -> Self {
        Self {
            min_movement_mm: 150.0,
            max_depth_change_mm: 100,
            min_height_change_mm: 100,
            hands_gate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurtsyPhase {
    Standing,
    Lowered,
}

impl CurtsyPhase {
    pub fn index(self) -> usize {
        match self {
            Self::Standing => 0,
            Self::Lowered => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurtsyStep {
    Anchor,
    Hold,
    /// Head went down (from `Standing`) or back up (from `Lowered`).
    Advance,
    /// Head moved some other way: step back a phase and restart there.
    Reanchor,
}

const HEAD_SLOTS: usize = 2;

/// Curtsy classifier state.
#[derive(Debug, Clone)]
pub struct CurtsyTracker {
    phase: CurtsyPhase,
    heads: JointBuffer<HEAD_SLOTS>,
}

impl Default for CurtsyTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Both hands below the head and each one outside its elbow.
fn hands_in_pose(frame: &SkeletonFrame, head: &Joint) -> Option<bool> {
    let right_hand = frame.get(JointId::RightHand)?;
    let left_hand = frame.get(JointId::LeftHand)?;
    let right_elbow = frame.get(JointId::RightElbow)?;
    let left_elbow = frame.get(JointId::LeftElbow)?;

    Some(
        right_hand.y >= head.y
            && left_hand.y >= head.y
            && right_hand.x <= right_elbow.x
            && left_hand.x >= left_elbow.x,
    )
}

impl CurtsyTracker {
    pub const CAPACITY: usize = HEAD_SLOTS;

    pub fn new() -> Self {
        Self {
            phase: CurtsyPhase::Standing,
            heads: JointBuffer::new(),
        }
    }

    pub fn clear(&mut self) {
        self.phase = CurtsyPhase::Standing;
        self.heads.clear();
    }

    pub fn phase(&self) -> CurtsyPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.phase.index()
    }

    pub fn captured(&self) -> usize {
        self.heads.len()
    }

    fn step(&self, head: &Joint, config: &CurtsyConfig) -> CurtsyStep {
        let Some(previous) = self.heads.get(self.phase.index()) else {
            return CurtsyStep::Anchor;
        };

        if joint_distance(&previous, head) < config.min_movement_mm {
            return CurtsyStep::Hold;
        }

        let level = (previous.z - head.z).abs() < config.max_depth_change_mm;
        let vertical = (previous.y - head.y).abs() > config.min_height_change_mm;
        if !(level && vertical) {
            return CurtsyStep::Reanchor;
        }

        match self.phase {
            CurtsyPhase::Standing if previous.y < head.y => CurtsyStep::Advance,
            CurtsyPhase::Lowered if previous.y > head.y => CurtsyStep::Advance,
            _ => CurtsyStep::Hold,
        }
    }

    /// Process one frame.  Returns true when the curtsy is complete; the
    /// tracker is already cleared by then.
    pub fn update(&mut self, frame: &SkeletonFrame, config: &CurtsyConfig) -> bool {
        let Some(head) = frame.get(JointId::Head) else {
            return false;
        };
        if !frame.contains(JointId::LeftHand) || !frame.contains(JointId::RightHand) {
            return false;
        }

        if config.hands_gate {
            match hands_in_pose(frame, &head) {
                None => return false,
                Some(false) => {
                    if !self.heads.is_empty() {
                        debug!(cursor = self.cursor(), "curtsy: hands out of pose, cleared");
                    }
                    self.clear();
                    return false;
                }
                Some(true) => {}
            }
        }

        let slot = self.phase.index();
        match self.step(&head, config) {
            CurtsyStep::Anchor => {
                self.heads.set(slot, head);
                debug!(cursor = slot, "curtsy: reference captured");
            }
            CurtsyStep::Hold => {
                trace!(cursor = slot, "curtsy: holding");
            }
            CurtsyStep::Reanchor => {
                self.heads.take(slot);
                self.phase = CurtsyPhase::Standing;
                self.heads.set(self.phase.index(), head);
                debug!(from = slot, "curtsy: ambiguous motion, re-anchored");
            }
            CurtsyStep::Advance => match self.phase {
                CurtsyPhase::Standing => {
                    self.phase = CurtsyPhase::Lowered;
                    self.heads.set(CurtsyPhase::Lowered.index(), head);
                    debug!(cursor = 1, "curtsy: head lowered");
                }
                CurtsyPhase::Lowered => {
                    debug!("curtsy: complete");
                    self.clear();
                    return true;
                }
            },
        }
        false
    }
}

#[cfg(test)]
fn curtsy_frame(head_y: i32, head_z: i32) -> SkeletonFrame {
    SkeletonFrame::new()
        .with(JointId::Head, Joint::new(0, head_y, head_z, 320, 100))
        .with(JointId::RightElbow, Joint::new(-200, -100, 2000, 260, 200))
        .with(JointId::RightHand, Joint::new(-250, 0, 2000, 250, 240))
        .with(JointId::LeftElbow, Joint::new(200, -100, 2000, 380, 200))
        .with(JointId::LeftHand, Joint::new(250, 0, 2000, 390, 240))
}
