//! Blown kiss: a hand starts at the mouth and is thrown toward the
//! camera in two strides.

use tracing::{debug, trace};

use super::session::JointBuffer;
use crate::geometry::joint_distance;
use crate::skeleton::{Joint, JointId, SkeletonFrame};

/// Thresholds for kiss recognition (millimeters).
#[derive(Debug, Clone, PartialEq)]
pub struct KissConfig {
    /// The hand must start closer than this to the head.
    pub max_start_distance_mm: f32,
    /// Each stride must be longer than this...
    pub min_stride_mm: f32,
    /// ...and shorter than this.
    pub max_stride_mm: f32,
}

impl Default for KissConfig {
    fn default() -> Self {
        Self {
            max_start_distance_mm: 400.0,
            min_stride_mm: 200.0,
            max_stride_mm: 500.0,
        }
    }
}

/// Position in the kiss sequence.
///
/// Slot 0 holds the head seen when tracking started; `Raised` and
/// `Blowing` keep the hand that reached them in slots 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KissPhase {
    Idle,
    Raised,
    Blowing,
}

impl KissPhase {
    pub fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Raised => 1,
            Self::Blowing => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KissStep {
    /// Head or both hands lost: start over.
    Abort,
    Hold,
    /// Hand reached the next phase.
    Advance,
}

const KISS_SLOTS: usize = 3;

/// Kiss classifier state.
#[derive(Debug, Clone)]
pub struct KissTracker {
    phase: KissPhase,
    joints: JointBuffer<KISS_SLOTS>,
}

impl Default for KissTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// The only hand present, or the higher one when both are.
fn kissing_hand(frame: &SkeletonFrame) -> Option<Joint> {
    match (frame.get(JointId::LeftHand), frame.get(JointId::RightHand)) {
        (Some(left), Some(right)) => Some(if left.y < right.y { left } else { right }),
        (Some(hand), None) | (None, Some(hand)) => Some(hand),
        (None, None) => None,
    }
}

impl KissTracker {
    pub const CAPACITY: usize = KISS_SLOTS;

    pub fn new() -> Self {
        Self {
            phase: KissPhase::Idle,
            joints: JointBuffer::new(),
        }
    }

    pub fn clear(&mut self) {
        self.phase = KissPhase::Idle;
        self.joints.clear();
    }

    pub fn phase(&self) -> KissPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.phase.index()
    }

    pub fn captured(&self) -> usize {
        self.joints.len()
    }

    fn step(&self, head: &Joint, hand: &Joint, config: &KissConfig) -> KissStep {
        match self.phase {
            KissPhase::Idle => {
                if joint_distance(hand, head) < config.max_start_distance_mm {
                    KissStep::Advance
                } else {
                    KissStep::Hold
                }
            }
            KissPhase::Raised | KissPhase::Blowing => {
                let Some(previous) = self.joints.get(self.phase.index()) else {
                    return KissStep::Abort;
                };
                let stride = joint_distance(&previous, hand);
                if stride > config.min_stride_mm
                    && stride < config.max_stride_mm
                    && hand.z < previous.z
                {
                    KissStep::Advance
                } else {
                    KissStep::Hold
                }
            }
        }
    }

    /// Process one frame.  Returns true when the kiss is complete; the
    /// tracker is already cleared by then.
    pub fn update(&mut self, frame: &SkeletonFrame, config: &KissConfig) -> bool {
        let (head, hand) = match (frame.get(JointId::Head), kissing_hand(frame)) {
            (Some(head), Some(hand)) => (head, hand),
            _ => {
                if !self.joints.is_empty() {
                    debug!(cursor = self.cursor(), "kiss: tracking lost, starting over");
                }
                self.clear();
                return false;
            }
        };

        if self.phase == KissPhase::Idle && self.joints.get(0).is_none() {
            self.joints.set(0, head);
        }

        match self.step(&head, &hand, config) {
            KissStep::Abort => {
                debug!(cursor = self.cursor(), "kiss: reference missing, starting over");
                self.clear();
            }
            KissStep::Hold => {
                trace!(cursor = self.cursor(), "kiss: no stride");
            }
            KissStep::Advance => {
                let next = match self.phase {
                    KissPhase::Idle => KissPhase::Raised,
                    KissPhase::Raised => KissPhase::Blowing,
                    KissPhase::Blowing => {
                        debug!("kiss: complete");
                        self.clear();
                        return true;
                    }
                };
                self.phase = next;
                self.joints.set(next.index(), hand);
                debug!(cursor = next.index(), "kiss: hand advanced");
            }
        }
        false
    }
}

#[cfg(test)]
fn kiss_frame(head: Option<Joint>, left: Option<Joint>, right: Option<Joint>) -> SkeletonFrame {
    let mut frame = SkeletonFrame::new();
    if let Some(j) = head {
        frame.set(JointId::Head, j);
    }
    if let Some(j) = left {
        frame.set(JointId::LeftHand, j);
    }
    if let Some(j) = right {
        frame.set(JointId::RightHand, j);
    }
    frame
}

#[cfg(test)]
fn at(x: i32, y: i32, z: i32) -> Joint {
    Joint::new(x, y, z, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: Joint = Joint::new(0, -400, 1800, 320, 80);

    #[test]
    fn test_far_hand_never_starts() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        for _ in 0..5 {
            kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1200))), &config);
            assert_eq!(kiss.phase(), KissPhase::Idle);
        }
        assert_eq!(kiss.cursor(), 0);
    }

    #[test]
    fn test_near_hand_starts() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1450))), &config);
        assert_eq!(kiss.phase(), KissPhase::Raised);
        assert_eq!(kiss.cursor(), 1);
        assert_eq!(kiss.captured(), 2);
    }

    #[test]
    fn test_full_kiss_completes() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();

        assert!(!kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1450))), &config));
        assert!(!kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1150))), &config));
        assert_eq!(kiss.cursor(), 2);
        assert!(kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 850))), &config));

        assert_eq!(kiss.cursor(), 0);
        assert_eq!(kiss.captured(), 0);
    }

    #[test]
    fn test_stride_outside_band_holds() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1450))), &config);

        // Too short.
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1350))), &config);
        assert_eq!(kiss.cursor(), 1);
        // Too long.
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 850))), &config);
        assert_eq!(kiss.cursor(), 1);
        // Right length but away from the camera.
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1750))), &config);
        assert_eq!(kiss.cursor(), 1);
    }

    #[test]
    fn test_lost_hands_abort() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1450))), &config);
        assert_eq!(kiss.cursor(), 1);

        kiss.update(&kiss_frame(Some(HEAD), None, None), &config);
        assert_eq!(kiss.cursor(), 0);
        assert_eq!(kiss.captured(), 0);
    }

    #[test]
    fn test_lost_head_aborts() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        kiss.update(&kiss_frame(Some(HEAD), None, Some(at(0, -400, 1450))), &config);
        kiss.update(&kiss_frame(None, None, Some(at(0, -400, 1150))), &config);
        assert_eq!(kiss.cursor(), 0);
        assert_eq!(kiss.captured(), 0);
    }

    #[test]
    fn test_higher_hand_is_used() {
        let mut kiss = KissTracker::new();
        let config = KissConfig::default();
        // Left hand raised to the mouth, right hand hanging far away.
        let left = at(0, -400, 1500);
        let right = at(200, 300, 1800);
        kiss.update(&kiss_frame(Some(HEAD), Some(left), Some(right)), &config);
        assert_eq!(kiss.cursor(), 1);
    }

    #[test]
    fn test_kissing_hand_selection() {
        let high = at(0, -500, 1500);
        let low = at(0, 0, 1500);
        assert_eq!(kissing_hand(&kiss_frame(None, Some(high), Some(low))), Some(high));
        assert_eq!(kissing_hand(&kiss_frame(None, Some(low), Some(high))), Some(high));
        assert_eq!(kissing_hand(&kiss_frame(None, None, Some(low))), Some(low));
        assert_eq!(kissing_hand(&kiss_frame(None, None, None)), None);
    }
}
