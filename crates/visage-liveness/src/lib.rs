//! visage-liveness: blink and head-pose liveness gate.
//!
//! Decides from a stream of facial landmark frames whether the subject in
//! front of the camera is a live person rather than a photo held up to it.
//! Landmark extraction happens upstream; this crate only consumes points.
//!
//! Per frame, the eye aspect ratio of both eyes feeds an adaptive blink
//! detector, the nose position against the eye corners gives a facing-camera
//! flag, and a [`LivenessSession`] combines both into a [`Verdict`].

pub mod blink;
pub mod config;
pub mod ear;
pub mod geometry;
pub mod head_pose;
pub mod replay;
pub mod session;
pub mod source;
pub mod types;

pub use config::{ConfigError, LivenessConfig};
pub use replay::{replay, ReplayError, ReplayOptions, ReplayOutcome};
pub use session::{LivenessSession, SessionError, SessionState};
pub use source::{JsonLinesSource, LandmarkFrame, SourceError};
pub use types::{EyeLandmarks, FaceLandmarks, FrameReport, LandmarkError, Point2D, RawFace, Verdict};
