//! Eye Aspect Ratio (EAR) over a six-point eye contour.
//!
//! `EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
//!
//! Lower values mean a more closed eye. The ratio is scale-free, so the same
//! eye yields the same EAR regardless of its distance from the camera. Typical
//! open-eye values sit around 0.25 to 0.35; thresholds built on it are empirical.

use crate::geometry::distance;
use crate::types::EyeLandmarks;

/// Compute the EAR for one eye.
///
/// Returns `None` when any landmark is not finite or the corner-to-corner span
/// is zero (collapsed landmarks). Callers treat such a frame as indeterminate
/// and skip the blink update rather than feeding an infinity into the baseline.
pub fn eye_aspect_ratio(eye: &EyeLandmarks) -> Option<f32> {
    let p = eye.points();
    if !p.iter().all(|pt| pt.x.is_finite() && pt.y.is_finite()) {
        return None;
    }
    let vertical1 = distance(p[1], p[5]);
    let vertical2 = distance(p[2], p[4]);
    let horizontal = distance(p[0], p[3]);

    if horizontal == 0.0 {
        return None;
    }

    let ear = (vertical1 + vertical2) / (2.0 * horizontal);
    ear.is_finite().then_some(ear)
}
