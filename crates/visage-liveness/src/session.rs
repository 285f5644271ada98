//! Per-attempt liveness state machine.
//!
//! A [`LivenessSession`] is owned by one authentication attempt. It consumes
//! landmark frames serially and combines blink and head-pose signals into a
//! verdict:
//!
//! ```text
//! AWAITING_FACE --face--> TRACKING --recent blinks + facing--> LIVE (terminal)
//! ```
//!
//! Frames without a face leave all accumulated state untouched, so a momentary
//! detection miss does not discard blink progress. The session never reports a
//! spoof on its own; the caller decides how long to keep trying.

use thiserror::Error;

use crate::blink::{BlinkDetector, BlinkEvent};
use crate::config::{ConfigError, LivenessConfig};
use crate::ear::eye_aspect_ratio;
use crate::head_pose::HeadPose;
use crate::types::{FaceLandmarks, FrameReport, RawFace, Verdict};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session already reached LIVE; no further frames are accepted")]
    AlreadyTerminal,
    #[error("invalid liveness config: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    AwaitingFace,
    Tracking,
    Live,
}

pub struct LivenessSession {
    config: LivenessConfig,
    blink: BlinkDetector,
    is_facing_camera: bool,
    state: SessionState,
    frames_processed: u64,
}

impl LivenessSession {
    /// Start a session, validating the configuration up front.
    pub fn new(config: LivenessConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            blink: BlinkDetector::new(&config),
            config,
            is_facing_camera: false,
            state: SessionState::AwaitingFace,
            frames_processed: 0,
        })
    }

    /// Process one frame's detections. Only the first face is considered.
    pub fn process_frame(
        &mut self,
        faces: &[FaceLandmarks],
        now_ms: u64,
    ) -> Result<FrameReport, SessionError> {
        if self.state == SessionState::Live {
            return Err(SessionError::AlreadyTerminal);
        }
        self.frames_processed += 1;

        let Some(face) = faces.first() else {
            return Ok(self.report(Verdict::NoFace, None, None, false));
        };
        if faces.len() > 1 {
            tracing::trace!(faces = faces.len(), "multiple faces; using the first");
        }
        self.state = SessionState::Tracking;

        let ears = eye_aspect_ratio(&face.left_eye).zip(eye_aspect_ratio(&face.right_eye));
        let mut avg_ear = None;
        let mut onset = false;
        match ears {
            Some((left, right)) => {
                avg_ear = Some((left + right) / 2.0);
                onset = self.blink.update(left, right, now_ms) == BlinkEvent::Onset;
            }
            None => tracing::warn!(now_ms, "degenerate eye landmarks; skipping blink update"),
        }

        let pose = HeadPose::classify(face, self.config.facing_threshold);
        if pose.nose_offset.is_none() {
            tracing::warn!(now_ms, "degenerate eye span; treating as not facing camera");
        }
        self.is_facing_camera = pose.facing;

        tracing::debug!(
            now_ms,
            avg_ear = ?avg_ear,
            nose_offset = ?pose.nose_offset,
            facing = pose.facing,
            blink_count = self.blink.blink_count(),
            "frame processed"
        );

        if self.is_live(now_ms) {
            self.state = SessionState::Live;
            tracing::info!(
                blink_count = self.blink.blink_count(),
                frames = self.frames_processed,
                "liveness confirmed"
            );
            return Ok(self.report(Verdict::Live, avg_ear, pose.nose_offset, onset));
        }

        Ok(self.report(Verdict::Tracking, avg_ear, pose.nose_offset, onset))
    }

    /// Process raw collaborator output. A malformed first face is treated as
    /// no detection for this frame.
    pub fn process_raw(&mut self, faces: &[RawFace], now_ms: u64) -> Result<FrameReport, SessionError> {
        let Some(raw) = faces.first() else {
            return self.process_frame(&[], now_ms);
        };
        match FaceLandmarks::try_from(raw) {
            Ok(face) => self.process_frame(std::slice::from_ref(&face), now_ms),
            Err(e) => {
                tracing::warn!(error = %e, now_ms, "malformed landmarks; treating frame as no face");
                self.process_frame(&[], now_ms)
            }
        }
    }

    /// Recent enough blinks, enough of them, and facing the camera.
    fn is_live(&self, now_ms: u64) -> bool {
        let recent = self
            .blink
            .since_last_blink(now_ms)
            .is_some_and(|elapsed| elapsed < self.config.blink_duration_ms);
        recent && self.is_facing_camera && self.blink.blink_count() >= self.config.required_blinks
    }

    fn report(
        &self,
        verdict: Verdict,
        avg_ear: Option<f32>,
        nose_offset: Option<f32>,
        blink_onset: bool,
    ) -> FrameReport {
        FrameReport {
            verdict,
            blink_count: self.blink.blink_count(),
            is_facing_camera: self.is_facing_camera,
            avg_ear,
            nose_offset,
            blink_onset,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn blink_count(&self) -> u32 {
        self.blink.blink_count()
    }

    pub fn is_facing_camera(&self) -> bool {
        self.is_facing_camera
    }

    pub fn blink_detector(&self) -> &BlinkDetector {
        &self.blink
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
