//! Wave: a raised hand swings back and forth across its elbow.

use tracing::{debug, trace};

use super::session::JointBuffer;
use crate::skeleton::{Joint, JointId, SkeletonFrame};

#[derive(Debug, Clone, PartialEq)]
pub struct WaveConfig {
    /// How far above its elbow a hand must be to count as waving.
    pub min_hand_lift_mm: i32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            min_hand_lift_mm: 100,
        }
    }
}

/// Number of swings recorded; a flip while in the last phase completes
/// the wave.
pub const WAVE_PHASES: usize = 4;

const PAIR_SLOTS: usize = 6;
const PAIRS: usize = PAIR_SLOTS / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaveStep {
    /// Head lost, or both hands lost.
    Abort,
    /// No swing recorded for this phase yet.
    Anchor(Joint, Joint),
    Hold,
    /// Hand crossed to the other side of the elbow.
    Advance(Joint, Joint),
    /// No hand raised: forget the current swing.
    StepBack,
}

/// Wave classifier state.
///
/// The first three phases each record a hand/elbow pair.  The last phase
/// only needs to know which side of the elbow the hand was on, so it
/// keeps that sign instead of a pair.
#[derive(Debug, Clone)]
pub struct WaveTracker {
    phase: usize,
    pairs: JointBuffer<PAIR_SLOTS>,
    last_side: Option<i32>,
}

impl Default for WaveTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn sign(n: i32) -> i32 {
    if n >= 0 {
        1
    } else {
        -1
    }
}

fn can_wave(hand: Option<Joint>, elbow: Option<Joint>, config: &WaveConfig) -> Option<(Joint, Joint)> {
    let (hand, elbow) = (hand?, elbow?);
    (hand.y < elbow.y && (hand.y - elbow.y).abs() > config.min_hand_lift_mm).then_some((hand, elbow))
}

/// The right hand if it is raised, otherwise the left.
fn waving_pair(frame: &SkeletonFrame, config: &WaveConfig) -> Option<(Joint, Joint)> {
    can_wave(frame.get(JointId::RightHand), frame.get(JointId::RightElbow), config).or_else(|| {
        can_wave(frame.get(JointId::LeftHand), frame.get(JointId::LeftElbow), config)
    })
}

impl WaveTracker {
    pub const CAPACITY: usize = PAIR_SLOTS;

    pub fn new() -> Self {
        Self {
            phase: 0,
            pairs: JointBuffer::new(),
            last_side: None,
        }
    }

    pub fn clear(&mut self) {
        self.phase = 0;
        self.pairs.clear();
        self.last_side = None;
    }

    /// Swings recorded so far, `0..WAVE_PHASES`.
    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Buffer cursor: two slots per recorded swing.
    pub fn cursor(&self) -> usize {
        self.phase * 2
    }

    pub fn captured(&self) -> usize {
        self.pairs.len()
    }

    /// Side of the elbow the hand was on when `phase` was recorded.
    fn side(&self, phase: usize) -> Option<i32> {
        if phase >= PAIRS {
            return self.last_side;
        }
        let slot = phase * 2;
        let (hand, elbow) = (self.pairs.get(slot)?, self.pairs.get(slot + 1)?);
        Some(sign(hand.x - elbow.x))
    }

    fn store(&mut self, phase: usize, hand: Joint, elbow: Joint) {
        if phase >= PAIRS {
            self.last_side = Some(sign(hand.x - elbow.x));
            return;
        }
        self.pairs.set(phase * 2, hand);
        self.pairs.set(phase * 2 + 1, elbow);
    }

    fn forget(&mut self, phase: usize) {
        if phase >= PAIRS {
            self.last_side = None;
            return;
        }
        self.pairs.take(phase * 2);
        self.pairs.take(phase * 2 + 1);
    }

    fn step(&self, frame: &SkeletonFrame, config: &WaveConfig) -> WaveStep {
        let hands_lost =
            !frame.contains(JointId::LeftHand) && !frame.contains(JointId::RightHand);
        if !frame.contains(JointId::Head) || hands_lost {
            return WaveStep::Abort;
        }

        let Some((hand, elbow)) = waving_pair(frame, config) else {
            return WaveStep::StepBack;
        };
        match self.side(self.phase) {
            None => WaveStep::Anchor(hand, elbow),
            Some(side) if side != sign(hand.x - elbow.x) => WaveStep::Advance(hand, elbow),
            Some(_) => WaveStep::Hold,
        }
    }

    /// Process one frame.  Returns true when the wave is complete; the
    /// tracker is already cleared by then.
    pub fn update(&mut self, frame: &SkeletonFrame, config: &WaveConfig) -> bool {
        match self.step(frame, config) {
            WaveStep::Abort => {
                if !self.pairs.is_empty() {
                    debug!(cursor = self.cursor(), "wave: tracking lost, starting over");
                }
                self.clear();
            }
            WaveStep::Hold => {
                trace!(cursor = self.cursor(), "wave: hand on the same side");
            }
            WaveStep::StepBack => {
                if self.side(self.phase).is_some() {
                    self.forget(self.phase);
                    self.phase = self.phase.saturating_sub(1);
                    debug!(cursor = self.cursor(), "wave: hand lowered, stepped back");
                }
            }
            WaveStep::Anchor(hand, elbow) => {
                self.store(self.phase, hand, elbow);
                debug!(cursor = self.cursor(), "wave: swing captured");
            }
            WaveStep::Advance(hand, elbow) => {
                if self.phase + 1 == WAVE_PHASES {
                    debug!("wave: complete");
                    self.clear();
                    return true;
                }
                self.phase += 1;
                self.store(self.phase, hand, elbow);
                debug!(cursor = self.cursor(), "wave: hand crossed the elbow");
            }
        }
        false
    }
}

#[cfg(test)]
fn wave_frame(hand_dx: i32) -> SkeletonFrame {
    SkeletonFrame::new()
        .with(JointId::Head, Joint::new(0, -400, 1800, 320, 80))
        .with(JointId::RightElbow, Joint::new(-200, -100, 1800, 260, 200))
        .with(JointId::RightHand, Joint::new(-200 + hand_dx, -350, 1750, 260, 100))
}

#[cfg(test)]
fn lowered_frame() -> SkeletonFrame {
    SkeletonFrame::new()
        .with(JointId::Head, Joint::new(0, -400, 1800, 320, 80))
        .with(JointId::RightElbow, Joint::new(-200, -100, 1800, 260, 200))
        .with(JointId::RightHand, Joint::new(-200, 100, 1800, 260, 280))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_flips_complete_once() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();

        assert!(!wave.update(&wave_frame(100), &config));
        assert_eq!(wave.cursor(), 0);

        let mut path = Vec::new();
        let mut fired = 0;
        for dx in [-100, 100, -100, 100] {
            if wave.update(&wave_frame(dx), &config) {
                fired += 1;
            }
            path.push(wave.cursor());
        }
        assert_eq!(path, vec![2, 4, 6, 0]);
        assert_eq!(fired, 1);
        assert_eq!(wave.captured(), 0);
    }

    #[test]
    fn test_same_side_holds() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        wave.update(&wave_frame(100), &config);
        wave.update(&wave_frame(150), &config);
        assert_eq!(wave.cursor(), 0);
        assert_eq!(wave.captured(), 2);
    }

    #[test]
    fn test_zero_offset_counts_as_positive() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        wave.update(&wave_frame(0), &config);
        wave.update(&wave_frame(50), &config);
        assert_eq!(wave.cursor(), 0);
        wave.update(&wave_frame(-1), &config);
        assert_eq!(wave.cursor(), 2);
    }

    #[test]
    fn test_lowered_hand_steps_back() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        wave.update(&wave_frame(100), &config);
        wave.update(&wave_frame(-100), &config);
        wave.update(&wave_frame(100), &config);
        assert_eq!(wave.cursor(), 4);

        wave.update(&lowered_frame(), &config);
        assert_eq!(wave.cursor(), 2);
        assert_eq!(wave.captured(), 4);

        // Hand back up on the side of the surviving pair: no flip.
        wave.update(&wave_frame(-100), &config);
        assert_eq!(wave.cursor(), 2);
        wave.update(&wave_frame(100), &config);
        assert_eq!(wave.cursor(), 4);
    }

    #[test]
    fn test_step_back_from_last_phase_keeps_first_pair() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        for dx in [100, -100, 100, -100] {
            wave.update(&wave_frame(dx), &config);
        }
        assert_eq!(wave.cursor(), 6);
        assert_eq!(wave.captured(), 6);

        let mut steps = Vec::new();
        for _ in 0..3 {
            wave.update(&lowered_frame(), &config);
            steps.push((wave.cursor(), wave.captured()));
        }
        assert_eq!(steps, vec![(4, 6), (2, 4), (0, 2)]);

        // The first swing survives, so the opposite side advances.
        wave.update(&wave_frame(-100), &config);
        assert_eq!(wave.cursor(), 2);
        assert_eq!(wave.captured(), 4);
    }

    #[test]
    fn test_lowered_hand_at_start_clears_anchor() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        wave.update(&wave_frame(100), &config);
        wave.update(&lowered_frame(), &config);
        assert_eq!(wave.cursor(), 0);
        assert_eq!(wave.captured(), 0);
    }

    #[test]
    fn test_lost_hands_abort() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        wave.update(&wave_frame(100), &config);
        wave.update(&wave_frame(-100), &config);

        let mut frame = wave_frame(100);
        frame.remove(JointId::RightHand);
        wave.update(&frame, &config);
        assert_eq!(wave.cursor(), 0);
        assert_eq!(wave.captured(), 0);
    }

    #[test]
    fn test_left_hand_used_when_right_is_down() {
        let mut wave = WaveTracker::new();
        let config = WaveConfig::default();
        let frame = |dx: i32| {
            lowered_frame()
                .with(JointId::LeftElbow, Joint::new(200, -100, 1800, 380, 200))
                .with(JointId::LeftHand, Joint::new(200 + dx, -350, 1750, 380, 100))
        };
        wave.update(&frame(100), &config);
        wave.update(&frame(-100), &config);
        assert_eq!(wave.cursor(), 2);
    }

    #[test]
    fn test_small_lift_does_not_qualify() {
        let config = WaveConfig::default();
        let hand = Joint::new(0, -150, 0, 0, 0);
        let elbow = Joint::new(0, -100, 0, 0, 0);
        assert!(can_wave(Some(hand), Some(elbow), &config).is_none());
        assert!(can_wave(None, Some(elbow), &config).is_none());
    }
}
