//! Drive a session from a sequence of frames until it becomes live, the
//! frames run out, or an overall timeout expires.

use thiserror::Error;

use crate::session::{LivenessSession, SessionError};
use crate::source::{LandmarkFrame, SourceError};
use crate::types::{FrameReport, Verdict};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Give up once this many ms have elapsed since the first frame.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    /// Verdict of the last processed frame.
    pub verdict: Verdict,
    pub frames_processed: usize,
    /// Timestamp of the frame that reached LIVE.
    pub live_at_ms: Option<u64>,
    pub timed_out: bool,
    pub blink_count: u32,
}

/// Feed frames into `session`, calling `on_report` after each one.
///
/// Frames lacking a timestamp are placed `frame_interval_ms` after the
/// previous frame (the first at 0), saturating at `u64::MAX`. Processing stops at the first LIVE
/// verdict without consuming further frames.
pub fn replay<I, F>(
    session: &mut LivenessSession,
    frames: I,
    options: &ReplayOptions,
    mut on_report: F,
) -> Result<ReplayOutcome, ReplayError>
where
    I: IntoIterator<Item = Result<LandmarkFrame, SourceError>>,
    F: FnMut(u64, &FrameReport),
{
    let interval = session.config().frame_interval_ms;
    let mut outcome = ReplayOutcome {
        verdict: Verdict::NoFace,
        frames_processed: 0,
        live_at_ms: None,
        timed_out: false,
        blink_count: session.blink_count(),
    };
    let mut start_ms: Option<u64> = None;
    let mut prev_ms: Option<u64> = None;

    for frame in frames {
        let frame = frame?;
        let now_ms = frame
            .timestamp_ms
            .unwrap_or_else(|| prev_ms.map_or(0, |p| p.saturating_add(interval)));
        prev_ms = Some(now_ms);
        let start = *start_ms.get_or_insert(now_ms);

        if let Some(timeout) = options.timeout_ms {
            if now_ms.saturating_sub(start) > timeout {
                tracing::info!(
                    elapsed_ms = now_ms.saturating_sub(start),
                    timeout_ms = timeout,
                    "replay timed out before liveness"
                );
                outcome.timed_out = true;
                break;
            }
        }

        let report = session.process_raw(&frame.faces, now_ms)?;
        outcome.frames_processed += 1;
        outcome.verdict = report.verdict;
        outcome.blink_count = report.blink_count;
        on_report(now_ms, &report);

        if report.verdict == Verdict::Live {
            outcome.live_at_ms = Some(now_ms);
            break;
        }
    }

    Ok(outcome)
}
