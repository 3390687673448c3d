//! Greeting gesture classifiers.
//!
//! Temporal classifiers (bow, kiss, curtsy, wave) follow a reference
//! joint through named phases.  Hand-pose classifiers (metal, east coast,
//! praying) count consecutive qualifying depth frames.

use std::fmt;

pub mod bow;
pub mod curtsy;
pub mod hand_pose;
pub mod kiss;
pub mod session;
pub mod wave;

pub use bow::{BowConfig, BowTracker};
pub use curtsy::{CurtsyConfig, CurtsyTracker};
pub use hand_pose::{HandPose, HandPoseConfig, HandPoseTracker};
pub use kiss::{KissConfig, KissTracker};
pub use session::JointBuffer;
pub use wave::{WaveConfig, WaveTracker};

/// Gestures the installation can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureId {
    /// Nothing tracked; frames are ignored.
    #[default]
    None,
    Bow,
    Kiss,
    Curtsy,
    Wave,
    /// Two fingers raised sideways.
    EastCoast,
    /// Index and little finger raised.
    Metal,
    /// Palms joined in front of the chest.
    Indian,
}

impl GestureId {
    pub const ALL: [GestureId; 8] = [
        Self::None,
        Self::Bow,
        Self::Kiss,
        Self::Curtsy,
        Self::Wave,
        Self::EastCoast,
        Self::Metal,
        Self::Indian,
    ];

    /// String representation for traces and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bow => "bow",
            Self::Kiss => "kiss",
            Self::Curtsy => "curtsy",
            Self::Wave => "wave",
            Self::EastCoast => "east-coast",
            Self::Metal => "metal",
            Self::Indian => "indian",
        }
    }

    /// Parse a gesture name as produced by [`GestureId::as_str`].
    pub fn from_name(s: &str) -> Option<GestureId> {
        Self::ALL.iter().copied().find(|g| g.as_str() == s)
    }

    /// Whether the gesture is judged from the depth image.
    pub fn needs_depth(&self) -> bool {
        matches!(self, Self::EastCoast | Self::Metal | Self::Indian)
    }

    /// Joint slots reserved for the gesture's session buffer.
    pub fn buffer_capacity(&self) -> usize {
        match self {
            Self::Bow => BowTracker::CAPACITY,
            Self::Kiss => KissTracker::CAPACITY,
            Self::Curtsy => CurtsyTracker::CAPACITY,
            Self::Wave => WaveTracker::CAPACITY,
            Self::None | Self::EastCoast | Self::Metal | Self::Indian => 0,
        }
    }
}

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_name_round_trip() {
        for id in GestureId::ALL {
            assert_eq!(GestureId::from_name(id.as_str()), Some(id));
        }
        assert_eq!(GestureId::from_name("handshake"), None);
    }

    #[test]
    fn test_gesture_as_str() {
        assert_eq!(GestureId::EastCoast.as_str(), "east-coast");
        assert_eq!(GestureId::Indian.to_string(), "indian");
    }

    #[test]
    fn test_buffer_capacity_table() {
        assert_eq!(GestureId::Bow.buffer_capacity(), 3);
        assert_eq!(GestureId::Kiss.buffer_capacity(), 3);
        assert_eq!(GestureId::Curtsy.buffer_capacity(), 2);
        assert_eq!(GestureId::Wave.buffer_capacity(), 6);
        assert_eq!(GestureId::Metal.buffer_capacity(), 0);
        assert_eq!(GestureId::None.buffer_capacity(), 0);
    }

    #[test]
    fn test_needs_depth() {
        assert!(GestureId::Metal.needs_depth());
        assert!(GestureId::Indian.needs_depth());
        assert!(!GestureId::Wave.needs_depth());
    }
}
