//! Skeleton tracker data structures.
//!
//! Models the seven upper-body joints reported by the skeleton tracker,
//! the per-frame sparse joint snapshot, and the borrowed raw depth image
//! that accompanies it.  Positions are millimeters from the sensor with
//! `y` growing downward, so a smaller `y` means a higher joint.

// ── Joint definitions ──────────────────────────────────────

/// Skeletal landmarks produced by the skeleton tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointId {
    Head,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHand,
    RightHand,
}

/// Total number of tracked joints.
pub const JOINT_COUNT: usize = 7;

impl JointId {
    /// All joints in index order.
    pub const ALL: [JointId; JOINT_COUNT] = [
        Self::Head,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftHand,
        Self::RightHand,
    ];

    /// Convert joint enum to array index (0-6).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// String representation for traces and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::LeftShoulder => "left-shoulder",
            Self::RightShoulder => "right-shoulder",
            Self::LeftElbow => "left-elbow",
            Self::RightElbow => "right-elbow",
            Self::LeftHand => "left-hand",
            Self::RightHand => "right-hand",
        }
    }

    /// Parse a joint name as produced by [`JointId::as_str`].
    pub fn from_name(s: &str) -> Option<JointId> {
        Self::ALL.iter().copied().find(|j| j.as_str() == s)
    }
}

// ── Joint ──────────────────────────────────────────────────

/// A tracked landmark: real-world position plus its screen projection.
///
/// Small and `Copy`, so classifiers keep their own copies instead of
/// pointing into a frame that only lives for one `feed` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Joint {
    /// Horizontal position in millimeters.
    pub x: i32,
    /// Vertical position in millimeters (grows downward).
    pub y: i32,
    /// Distance from the sensor in millimeters.
    pub z: i32,
    /// Projected column in the depth image.
    pub screen_x: i32,
    /// Projected row in the depth image.
    pub screen_y: i32,
}

impl Joint {
    pub const fn new(x: i32, y: i32, z: i32, screen_x: i32, screen_y: i32) -> Self {
        Self {
            x,
            y,
            z,
            screen_x,
            screen_y,
        }
    }
}

// ── Skeleton frame ─────────────────────────────────────────

/// One instant's joints.  Any joint may be missing after tracking loss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonFrame {
    joints: [Option<Joint>; JOINT_COUNT],
}

impl SkeletonFrame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: JointId, joint: Joint) -> Self {
        self.set(id, joint);
        self
    }

    pub fn set(&mut self, id: JointId, joint: Joint) {
        self.joints[id.index()] = Some(joint);
    }

    pub fn remove(&mut self, id: JointId) -> Option<Joint> {
        self.joints[id.index()].take()
    }

    /// Joint by id, if the tracker reported it this frame.
    pub fn get(&self, id: JointId) -> Option<Joint> {
        self.joints[id.index()]
    }

    pub fn contains(&self, id: JointId) -> bool {
        self.joints[id.index()].is_some()
    }

    /// Number of joints present.
    pub fn len(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate present joints in index order.
    pub fn iter(&self) -> impl Iterator<Item = (JointId, Joint)> + '_ {
        JointId::ALL
            .iter()
            .filter_map(move |id| self.get(*id).map(|j| (*id, j)))
    }
}

// ── Depth frame ────────────────────────────────────────────

/// Borrowed raw depth image, row-major, one millimeter sample per pixel.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrame<'a> {
    data: &'a [u16],
    width: u32,
    height: u32,
}

impl<'a> DepthFrame<'a> {
    /// Wrap a sample buffer.  Returns `None` if `data` holds fewer than
    /// `width * height` samples.
    pub fn new(data: &'a [u16], width: u32, height: u32) -> Option<Self> {
        let needed = (width as usize).checked_mul(height as usize)?;
        if data.len() < needed {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at column `x`, row `y`.  Out-of-bounds reads yield `None`.
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}
