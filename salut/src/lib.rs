//! Salut: greeting gesture recognition for a depth-camera installation.
//!
//! A skeleton tracker delivers one [`SkeletonFrame`] per camera frame,
//! plus the raw depth image when a hand pose is being watched.  The
//! [`Salut`] dispatcher routes each frame to the classifier of the
//! gesture the narrative is waiting for and runs its completion callback
//! when the visitor performs it.

pub mod config;
pub mod dispatcher;
pub mod geometry;
pub mod gesture;
pub mod hand_shape;
pub mod presence;
pub mod sexp;
pub mod skeleton;
pub mod trace;

pub use config::SalutConfig;
pub use dispatcher::{CompletionCallback, Salut};
pub use gesture::GestureId;
pub use hand_shape::Defect;
pub use presence::{PresenceConfig, PresenceEvent, PresenceMonitor};
pub use skeleton::{DepthFrame, Joint, JointId, SkeletonFrame};
