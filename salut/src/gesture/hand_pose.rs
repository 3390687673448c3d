//! Static hand poses judged from the depth image: metal horns, the
//! sideways peace sign, and palms joined in prayer.
//!
//! These classifiers keep no joints, only the number of consecutive
//! qualifying frames.  Any frame that does not qualify, including one
//! delivered without depth, restarts the run.

use tracing::{debug, trace};

use crate::geometry::{orientation_angle, point_distance, slope_angle, whole_degrees};
use crate::hand_shape::{self, Defect, HandShapeConfig};
use crate::skeleton::{DepthFrame, Joint, JointId, SkeletonFrame};

#[derive(Debug, Clone, PartialEq)]
pub struct HandPoseConfig {
    /// Consecutive qualifying frames that complete a pose.
    pub run_length: u32,
    /// A hand must be this far in front of the head to be analyzed.
    pub min_head_separation_mm: i32,
    /// Opening slope band (degrees) for the sideways peace sign.
    pub horizontal_min_deg: f32,
    pub horizontal_max_deg: f32,
    /// Minimum defect depth between joined palms, in pixels.
    pub praying_min_depth: f32,
    /// How far from vertical (degrees) a palm-gap defect must open.
    pub praying_vertical_margin_deg: i32,
    /// The praying region sits this far in front of the shoulders.
    pub praying_region_offset_mm: i32,
}

impl Default for HandPoseConfig {
    fn default() -> Self {
        Self {
            run_length: 5,
            min_head_separation_mm: 150,
            horizontal_min_deg: 45.0,
            horizontal_max_deg: 90.0,
            praying_min_depth: 20.0,
            praying_vertical_margin_deg: 25,
            praying_region_offset_mm: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPose {
    /// Index and little finger raised: one finger gap.
    Metal,
    /// Two fingers held sideways: two gaps opening horizontally.
    EastCoast,
    /// Palms joined in front of the chest.
    Praying,
}

impl HandPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::EastCoast => "east-coast",
            Self::Praying => "praying",
        }
    }
}

// ── Frame qualification ────────────────────────────────────

/// The hand held out toward the camera: the only hand present, or the
/// nearer of two when it is well in front of the head.
pub fn presented_hand(frame: &SkeletonFrame, config: &HandPoseConfig) -> Option<Joint> {
    let head = frame.get(JointId::Head)?;
    match (frame.get(JointId::LeftHand), frame.get(JointId::RightHand)) {
        (Some(hand), None) | (None, Some(hand)) => Some(hand),
        (Some(left), Some(right)) => {
            let clear_of_head = |hand: &Joint| (hand.z - head.z).abs() > config.min_head_separation_mm;
            if right.z < left.z && clear_of_head(&right) {
                Some(right)
            } else if left.z < right.z && clear_of_head(&left) {
                Some(left)
            } else {
                None
            }
        }
        (None, None) => None,
    }
}

pub fn metal_qualifies(defects: &[Defect]) -> bool {
    defects.len() == 1
}

/// Two gaps whose outer hull points lie on a line inclined within the
/// configured band, i.e. the fingers point sideways.
pub fn east_coast_qualifies(defects: &[Defect], config: &HandPoseConfig) -> bool {
    let [first, second] = defects else {
        return false;
    };
    let Some(slope) = slope_angle(first.start, second.end) else {
        return false;
    };
    slope >= config.horizontal_min_deg.to_radians() && slope <= config.horizontal_max_deg.to_radians()
}

/// Screen position and depth to analyze for joined palms: centered under
/// the head at elbow height, in front of the shoulders.  `None` when a
/// needed joint is missing or an elbow is raised above its shoulder.
pub fn praying_region(frame: &SkeletonFrame, config: &HandPoseConfig) -> Option<(i32, i32, i32)> {
    let head = frame.get(JointId::Head)?;
    let right_elbow = frame.get(JointId::RightElbow)?;
    let left_elbow = frame.get(JointId::LeftElbow)?;
    let right_shoulder = frame.get(JointId::RightShoulder)?;
    let left_shoulder = frame.get(JointId::LeftShoulder)?;

    if right_elbow.y < right_shoulder.y || left_elbow.y < left_shoulder.y {
        return None;
    }

    let z = (right_shoulder.z + left_shoulder.z) / 2 - config.praying_region_offset_mm;
    Some((head.screen_x, right_elbow.screen_y, z))
}

fn x_side(n: i32) -> i32 {
    n.signum()
}

/// A deep gap opening diagonally whose two hull points lie on the same
/// side of its deepest point, as the edge of one palm pressed on the
/// other.
fn palm_edge(defect: &Defect, config: &HandPoseConfig) -> bool {
    if defect.depth <= config.praying_min_depth {
        return false;
    }
    let Some(orientation) = orientation_angle(defect.start, defect.depth_point, defect.end) else {
        return false;
    };
    let degrees = whole_degrees(orientation);
    if degrees <= 0 || degrees >= 180 || (degrees - 90).abs() <= config.praying_vertical_margin_deg {
        return false;
    }

    let start_side = x_side(defect.start.x - defect.depth_point.x);
    let end_side = x_side(defect.end.x - defect.depth_point.x);
    start_side != 0 && start_side == end_side
}

/// Reach of a defect: distance from its higher hull point down to its
/// deepest point.
fn reach(defect: &Defect) -> f32 {
    let top = if defect.end.y < defect.start.y {
        defect.end
    } else {
        defect.start
    };
    point_distance(top, defect.depth_point)
}

/// Two neighbouring palm edges closer together than either one reaches:
/// two hands touching.
pub fn praying_qualifies(defects: &[Defect], config: &HandPoseConfig) -> bool {
    let edges: Vec<&Defect> = defects.iter().filter(|d| palm_edge(d, config)).collect();
    edges.windows(2).any(|pair| {
        let gap = point_distance(pair[0].depth_point, pair[1].depth_point);
        gap < reach(pair[0]).max(reach(pair[1]))
    })
}

// ── Tracker ────────────────────────────────────────────────

/// Run counter for one hand pose.
#[derive(Debug, Clone)]
pub struct HandPoseTracker {
    pose: HandPose,
    run: u32,
}

impl HandPoseTracker {
    pub fn new(pose: HandPose) -> Self {
        Self { pose, run: 0 }
    }

    pub fn pose(&self) -> HandPose {
        self.pose
    }

    pub fn run_count(&self) -> u32 {
        self.run
    }

    pub fn clear(&mut self) {
        self.run = 0;
    }

    /// Count one frame's verdict.  Returns true on the frame that
    /// completes the run; the counter is back at 0 by then.
    pub fn record(&mut self, qualifies: bool, config: &HandPoseConfig) -> bool {
        if !qualifies {
            if self.run > 0 {
                debug!(pose = self.pose.as_str(), run = self.run, "hand pose: run broken");
            }
            self.run = 0;
            return false;
        }

        self.run += 1;
        trace!(pose = self.pose.as_str(), run = self.run, "hand pose: qualifying frame");
        if self.run >= config.run_length {
            debug!(pose = self.pose.as_str(), "hand pose: complete");
            self.run = 0;
            return true;
        }
        false
    }

    fn qualifies(
        &self,
        frame: &SkeletonFrame,
        depth: &DepthFrame<'_>,
        config: &HandPoseConfig,
        shape: &HandShapeConfig,
    ) -> bool {
        match self.pose {
            HandPose::Metal | HandPose::EastCoast => {
                let Some(hand) = presented_hand(frame, config) else {
                    return false;
                };
                let defects = hand_shape::analyze(depth, hand.screen_x, hand.screen_y, hand.z, shape);
                if self.pose == HandPose::Metal {
                    metal_qualifies(&defects)
                } else {
                    east_coast_qualifies(&defects, config)
                }
            }
            HandPose::Praying => {
                let Some((x, y, z)) = praying_region(frame, config) else {
                    return false;
                };
                let defects = hand_shape::convexity_defects(depth, x, y, z, shape);
                praying_qualifies(&defects, config)
            }
        }
    }

    /// Process one frame.  Returns true when the pose has been held for
    /// the full run; the counter is already cleared by then.
    pub fn update(
        &mut self,
        frame: &SkeletonFrame,
        depth: Option<&DepthFrame<'_>>,
        config: &HandPoseConfig,
        shape: &HandShapeConfig,
    ) -> bool {
        let qualifies = match depth {
            Some(depth) => self.qualifies(frame, depth, config, shape),
            None => {
                trace!(pose = self.pose.as_str(), "hand pose: no depth frame");
                false
            }
        };
        self.record(qualifies, config)
    }
}

#[cfg(test)]
fn defect(start: (i32, i32), end: (i32, i32), depth_point: (i32, i32), depth: f32) -> Defect {
    use crate::geometry::Point;
    Defect {
        start: Point::new(start.0, start.1),
        end: Point::new(end.0, end.1),
        depth_point: Point::new(depth_point.0, depth_point.1),
        depth,
    }
}

#[cfg(test)]
fn joint(x: i32, y: i32, z: i32) -> Joint {
    Joint::new(x, y, z, 320, 240)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finger_gap() -> Defect {
        defect((10, 0), (30, 0), (20, 40), 40.0)
    }

    #[test]
    fn test_metal_interrupted_run_restarts() {
        let config = HandPoseConfig::default();
        let mut tracker = HandPoseTracker::new(HandPose::Metal);
        let one = [finger_gap()];

        let mut fired = false;
        for verdicts in [&one[..], &one[..], &one[..], &one[..], &one[..0], &one[..], &one[..]] {
            fired |= tracker.record(metal_qualifies(verdicts), &config);
        }
        assert!(!fired, "broken run must not complete");
        assert_eq!(tracker.run_count(), 2);
    }

    #[test]
    fn test_fifth_frame_completes() {
        let config = HandPoseConfig::default();
        let mut tracker = HandPoseTracker::new(HandPose::Praying);
        for i in 0..4 {
            assert!(!tracker.record(true, &config), "frame {} fired early", i);
        }
        assert_eq!(tracker.run_count(), 4);
        assert!(tracker.record(true, &config));
        assert_eq!(tracker.run_count(), 0);
    }

    #[test]
    fn test_missing_depth_resets_run() {
        let config = HandPoseConfig::default();
        let shape = HandShapeConfig::default();
        let mut tracker = HandPoseTracker::new(HandPose::Metal);
        tracker.record(true, &config);
        tracker.record(true, &config);

        let frame = SkeletonFrame::new().with(JointId::Head, joint(0, -400, 1800));
        assert!(!tracker.update(&frame, None, &config, &shape));
        assert_eq!(tracker.run_count(), 0);
    }

    #[test]
    fn test_metal_needs_exactly_one_gap() {
        assert!(metal_qualifies(&[finger_gap()]));
        assert!(!metal_qualifies(&[]));
        assert!(!metal_qualifies(&[finger_gap(), finger_gap()]));
    }

    #[test]
    fn test_east_coast_slope_band() {
        let config = HandPoseConfig::default();
        // first.start (0, 0) to second.end (10, 20): about 63 degrees.
        let steep = [defect((0, 0), (5, 0), (3, 5), 10.0), defect((5, 10), (10, 20), (8, 12), 10.0)];
        assert!(east_coast_qualifies(&steep, &config));

        // (0, 0) to (20, 5): about 14 degrees.
        let flat = [defect((0, 0), (5, 0), (3, 5), 10.0), defect((5, 10), (20, 5), (8, 12), 10.0)];
        assert!(!east_coast_qualifies(&flat, &config));

        // Vertical segment cannot be measured.
        let vertical = [defect((0, 0), (5, 0), (3, 5), 10.0), defect((5, 10), (0, 20), (8, 12), 10.0)];
        assert!(!east_coast_qualifies(&vertical, &config));

        assert!(!east_coast_qualifies(&steep[..1], &config));
    }

    #[test]
    fn test_sideways_fingers_from_depth() {
        let config = HandPoseConfig::default();
        let shape = HandShapeConfig::default();
        let data = hand_shape::sideways_fingers_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let defects = hand_shape::analyze(&depth, 320, 240, 1000, &shape);
        assert!(east_coast_qualifies(&defects, &config), "defects: {:?}", defects);
        assert!(!metal_qualifies(&defects));
    }

    #[test]
    fn test_horns_are_not_east_coast() {
        let config = HandPoseConfig::default();
        let shape = HandShapeConfig::default();
        let data = hand_shape::horns_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let defects = hand_shape::analyze(&depth, 320, 240, 1000, &shape);
        assert!(metal_qualifies(&defects));
        assert!(!east_coast_qualifies(&defects, &config));
    }

    #[test]
    fn test_presented_hand_selection() {
        let config = HandPoseConfig::default();
        let head = joint(0, -400, 1800);
        let near = joint(100, -200, 1400);
        let far = joint(-100, 0, 1750);

        let frame = SkeletonFrame::new()
            .with(JointId::Head, head)
            .with(JointId::RightHand, near)
            .with(JointId::LeftHand, far);
        assert_eq!(presented_hand(&frame, &config), Some(near));

        // Nearer hand still level with the head.
        let frame = SkeletonFrame::new()
            .with(JointId::Head, head)
            .with(JointId::RightHand, joint(100, -200, 1700))
            .with(JointId::LeftHand, far);
        assert_eq!(presented_hand(&frame, &config), None);

        let frame = SkeletonFrame::new().with(JointId::Head, head).with(JointId::LeftHand, far);
        assert_eq!(presented_hand(&frame, &config), Some(far));

        let frame = SkeletonFrame::new().with(JointId::LeftHand, far);
        assert_eq!(presented_hand(&frame, &config), None);
    }

    fn praying_frame(elbow_y: i32) -> SkeletonFrame {
        SkeletonFrame::new()
            .with(JointId::Head, Joint::new(0, -400, 1900, 320, 80))
            .with(JointId::RightShoulder, Joint::new(-180, -250, 1900, 270, 140))
            .with(JointId::LeftShoulder, Joint::new(180, -250, 2100, 370, 140))
            .with(JointId::RightElbow, Joint::new(-200, elbow_y, 1800, 260, 260))
            .with(JointId::LeftElbow, Joint::new(200, elbow_y, 1800, 380, 260))
    }

    #[test]
    fn test_joined_palms_from_depth() {
        let config = HandPoseConfig::default();
        let shape = HandShapeConfig::default();
        let data = hand_shape::joined_palms_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();

        let defects = hand_shape::convexity_defects(&depth, 320, 240, 800, &shape);
        assert!(praying_qualifies(&defects, &config), "defects: {:?}", defects);
    }

    #[test]
    fn test_praying_held_for_a_run() {
        let config = HandPoseConfig::default();
        let shape = HandShapeConfig::default();
        let data = hand_shape::joined_palms_depth();
        let depth = DepthFrame::new(&data, 640, 480).unwrap();
        let frame = praying_frame(0)
            .with(JointId::RightShoulder, Joint::new(-180, -250, 1100, 270, 140))
            .with(JointId::LeftShoulder, Joint::new(180, -250, 1100, 370, 140))
            .with(JointId::RightElbow, Joint::new(-200, 0, 1000, 260, 240));
        assert_eq!(praying_region(&frame, &config), Some((320, 240, 800)));

        let mut tracker = HandPoseTracker::new(HandPose::Praying);
        for i in 1..5 {
            assert!(!tracker.update(&frame, Some(&depth), &config, &shape));
            assert_eq!(tracker.run_count(), i);
        }
        assert!(tracker.update(&frame, Some(&depth), &config, &shape));
        assert_eq!(tracker.run_count(), 0);
    }

    #[test]
    fn test_praying_region() {
        let config = HandPoseConfig::default();
        assert_eq!(praying_region(&praying_frame(0), &config), Some((320, 260, 1700)));
    }

    #[test]
    fn test_raised_elbow_disqualifies_praying() {
        let config = HandPoseConfig::default();
        assert_eq!(praying_region(&praying_frame(-300), &config), None);

        let mut frame = praying_frame(0);
        frame.set(JointId::LeftElbow, Joint::new(200, -300, 1800, 380, 100));
        assert_eq!(praying_region(&frame, &config), None);

        frame.remove(JointId::LeftElbow);
        assert_eq!(praying_region(&frame, &config), None);
    }

    #[test]
    fn test_palm_edge_filter() {
        let config = HandPoseConfig::default();
        // Both hull points up and to the right of the deepest point,
        // opening at about 35 degrees.
        let edge = defect((30, 0), (60, 20), (0, 40), 30.0);
        assert!(palm_edge(&edge, &config));

        // Too shallow.
        assert!(!palm_edge(&defect((30, 0), (60, 20), (0, 40), 15.0), &config));
        // Hull points on opposite sides: a finger gap, not a palm edge.
        assert!(!palm_edge(&defect((-30, 0), (30, 0), (0, 40), 30.0), &config));
        // Opening downward.
        assert!(!palm_edge(&defect((30, 80), (60, 60), (0, 40), 30.0), &config));
    }

    #[test]
    fn test_praying_needs_close_edges() {
        let config = HandPoseConfig::default();
        let left_edge = defect((30, 0), (60, 20), (0, 40), 30.0);
        let right_edge = defect((40, 10), (70, 30), (10, 50), 30.0);
        assert!(praying_qualifies(&[left_edge, right_edge], &config));

        let far_edge = defect((230, 0), (260, 20), (200, 40), 30.0);
        assert!(!praying_qualifies(&[left_edge, far_edge], &config));
        assert!(!praying_qualifies(&[left_edge], &config));
    }
}
