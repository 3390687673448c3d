//! Gesture dispatcher: one active gesture, one classifier, one callback.
//!
//! The narrative controller selects the gesture it waits for, then every
//! skeleton frame is pushed through [`Salut::feed`].  When the active
//! classifier recognizes its gesture the completion callback runs
//! synchronously, at most once per recognized instance, and the
//! classifier is already back in its freshly-selected state.

use tracing::{debug, info, trace};

use crate::config::SalutConfig;
use crate::gesture::{
    BowTracker, CurtsyTracker, GestureId, HandPose, HandPoseTracker, KissTracker, WaveTracker,
};
use crate::sexp::flag;
use crate::skeleton::{DepthFrame, SkeletonFrame};

/// Callback run when the active gesture completes.  Whatever context the
/// controller needs is captured by the closure.
pub type CompletionCallback = Box<dyn FnMut()>;

/// Per-gesture classifier state.  Each temporal variant carries its own
/// fixed-capacity joint buffer; hand poses carry only a run counter.
#[derive(Debug, Clone)]
enum Classifier {
    Idle,
    Bow(BowTracker),
    Kiss(KissTracker),
    Curtsy(CurtsyTracker),
    Wave(WaveTracker),
    HandPose(HandPoseTracker),
}

impl Classifier {
    fn for_gesture(id: GestureId) -> Self {
        match id {
            GestureId::None => Self::Idle,
            GestureId::Bow => Self::Bow(BowTracker::new()),
            GestureId::Kiss => Self::Kiss(KissTracker::new()),
            GestureId::Curtsy => Self::Curtsy(CurtsyTracker::new()),
            GestureId::Wave => Self::Wave(WaveTracker::new()),
            GestureId::Metal => Self::HandPose(HandPoseTracker::new(HandPose::Metal)),
            GestureId::EastCoast => Self::HandPose(HandPoseTracker::new(HandPose::EastCoast)),
            GestureId::Indian => Self::HandPose(HandPoseTracker::new(HandPose::Praying)),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Idle => {}
            Self::Bow(t) => t.clear(),
            Self::Kiss(t) => t.clear(),
            Self::Curtsy(t) => t.clear(),
            Self::Wave(t) => t.clear(),
            Self::HandPose(t) => t.clear(),
        }
    }

    fn cursor(&self) -> usize {
        match self {
            Self::Idle | Self::HandPose(_) => 0,
            Self::Bow(t) => t.cursor(),
            Self::Kiss(t) => t.cursor(),
            Self::Curtsy(t) => t.cursor(),
            Self::Wave(t) => t.cursor(),
        }
    }

    fn captured(&self) -> usize {
        match self {
            Self::Idle | Self::HandPose(_) => 0,
            Self::Bow(t) => t.captured(),
            Self::Kiss(t) => t.captured(),
            Self::Curtsy(t) => t.captured(),
            Self::Wave(t) => t.captured(),
        }
    }

    fn run_count(&self) -> u32 {
        match self {
            Self::HandPose(t) => t.run_count(),
            _ => 0,
        }
    }

    fn update(
        &mut self,
        frame: &SkeletonFrame,
        depth: Option<&DepthFrame<'_>>,
        config: &SalutConfig,
    ) -> bool {
        match self {
            Self::Idle => false,
            Self::Bow(t) => t.update(frame, &config.bow),
            Self::Kiss(t) => t.update(frame, &config.kiss),
            Self::Curtsy(t) => t.update(frame, &config.curtsy),
            Self::Wave(t) => t.update(frame, &config.wave),
            Self::HandPose(t) => t.update(frame, depth, &config.hand_pose, &config.hand_shape),
        }
    }
}

/// The gesture recognition engine.
pub struct Salut {
    pub config: SalutConfig,
    active: GestureId,
    classifier: Classifier,
    on_complete: Option<CompletionCallback>,
    detection_enabled: bool,
}

impl Default for Salut {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Salut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Salut")
            .field("active", &self.active)
            .field("classifier", &self.classifier)
            .field("has_callback", &self.on_complete.is_some())
            .field("detection_enabled", &self.detection_enabled)
            .finish()
    }
}

impl Salut {
    pub fn new() -> Self {
        Self::with_config(SalutConfig::default())
    }

    pub fn with_config(config: SalutConfig) -> Self {
        Self {
            config,
            active: GestureId::None,
            classifier: Classifier::Idle,
            on_complete: None,
            detection_enabled: true,
        }
    }

    /// Start waiting for `id`, replacing any previous selection and its
    /// callback.  Re-selecting the active gesture only clears its
    /// progress; a different gesture gets a fresh classifier.
    pub fn select_gesture(&mut self, id: GestureId, on_complete: impl FnMut() + 'static) {
        self.select(id, Some(Box::new(on_complete)));
    }

    /// Stop classifying.  Equivalent to selecting [`GestureId::None`].
    pub fn stop(&mut self) {
        self.select(GestureId::None, None);
    }

    fn select(&mut self, id: GestureId, on_complete: Option<CompletionCallback>) {
        if id == self.active {
            self.classifier.clear();
            debug!(gesture = %id, "gesture re-selected, progress cleared");
        } else {
            self.classifier = Classifier::for_gesture(id);
            info!(gesture = %id, capacity = id.buffer_capacity(), "gesture selected");
        }
        self.active = id;
        self.on_complete = on_complete;
    }

    /// Push one skeleton frame, with the depth image for hand poses.
    ///
    /// Returns the gesture completed by this frame, after its callback has
    /// run.  The callback fires at most once per recognized instance,
    /// synchronously, before `feed` returns; it cannot call back into this
    /// engine.  To wait for the next gesture, select it once `feed` has
    /// returned.
    pub fn feed(&mut self, frame: &SkeletonFrame, depth: Option<&DepthFrame<'_>>) -> Option<GestureId> {
        if self.active == GestureId::None {
            return None;
        }
        if !self.detection_enabled {
            trace!(gesture = %self.active, "detection paused, frame ignored");
            return None;
        }

        if !self.classifier.update(frame, depth, &self.config) {
            return None;
        }

        info!(gesture = %self.active, "gesture recognized");
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
        Some(self.active)
    }

    /// Pause or resume classification without losing progress.
    pub fn set_detection_enabled(&mut self, enabled: bool) {
        if enabled != self.detection_enabled {
            debug!(enabled, "gesture detection toggled");
        }
        self.detection_enabled = enabled;
    }

    pub fn is_detection_enabled(&self) -> bool {
        self.detection_enabled
    }

    pub fn active_gesture(&self) -> GestureId {
        self.active
    }

    /// Buffer cursor of the active temporal classifier.
    pub fn cursor(&self) -> usize {
        self.classifier.cursor()
    }

    /// Joints currently held by the active classifier.
    pub fn captured(&self) -> usize {
        self.classifier.captured()
    }

    /// Buffer capacity of the active gesture; 0 for hand poses.
    pub fn capacity(&self) -> usize {
        self.active.buffer_capacity()
    }

    /// Consecutive qualifying frames of the active hand pose.
    pub fn run_count(&self) -> u32 {
        self.classifier.run_count()
    }

    /// Generate s-expression for the session state.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:gesture {} :cursor {} :captured {} :capacity {} :run {} :detection {})",
            self.active,
            self.cursor(),
            self.captured(),
            self.capacity(),
            self.run_count(),
            flag(self.detection_enabled),
        )
    }

    /// Generate s-expression for the engine configuration.
    pub fn config_sexp(&self) -> String {
        self.config.config_sexp()
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
use crate::skeleton::{Joint, JointId};

#[cfg(test)]
fn make_frame(joints: &[(JointId, Joint)]) -> SkeletonFrame {
    let mut frame = SkeletonFrame::new();
    for (id, joint) in joints {
        frame.set(*id, *joint);
    }
    frame
}

#[cfg(test)]
fn joint(x: i32, y: i32, z: i32) -> Joint {
    Joint::new(x, y, z, 320, 240)
}

#[cfg(test)]
fn wave_frame(hand_dx: i32) -> SkeletonFrame {
    make_frame(&[
        (JointId::Head, joint(0, -400, 1800)),
        (JointId::RightElbow, joint(-200, -100, 1800)),
        (JointId::RightHand, joint(-200 + hand_dx, -350, 1750)),
    ])
}

#[cfg(test)]
fn counter() -> (std::rc::Rc<std::cell::Cell<u32>>, impl FnMut() + 'static) {
    let count = std::rc::Rc::new(std::cell::Cell::new(0));
    let seen = count.clone();
    (count, move || seen.set(seen.get() + 1))
}
