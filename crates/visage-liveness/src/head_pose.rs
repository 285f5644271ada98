//! Frontal-pose check from the nose tip and the two outer eye corners.
//!
//! When the head turns, the nose tip moves horizontally away from the midpoint
//! between the eye corners. The offset is normalised by the corner-to-corner
//! span so it does not depend on the subject's distance from the camera.

use crate::geometry::{distance, midpoint_x};
use crate::types::{FaceLandmarks, Point2D};

/// Horizontal nose offset as a fraction of the eye span.
///
/// Returns `None` when the eye corners coincide or any input is non-finite.
pub fn nose_offset(nose: Point2D, left_corner: Point2D, right_corner: Point2D) -> Option<f32> {
    let face_width = distance(left_corner, right_corner);
    if !(face_width.is_finite() && face_width > 0.0) {
        return None;
    }
    let offset = (nose.x - midpoint_x(left_corner, right_corner)).abs() / face_width;
    offset.is_finite().then_some(offset)
}

/// Whether the subject faces the sensor. Indeterminate geometry counts as
/// not facing.
pub fn is_facing_camera(
    nose: Point2D,
    left_corner: Point2D,
    right_corner: Point2D,
    facing_threshold: f32,
) -> bool {
    nose_offset(nose, left_corner, right_corner).is_some_and(|o| o < facing_threshold)
}

/// Head-pose classification of one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub nose_offset: Option<f32>,
    pub facing: bool,
}

impl HeadPose {
    pub fn classify(face: &FaceLandmarks, facing_threshold: f32) -> Self {
        let offset = nose_offset(face.nose_tip(), face.left_eye.corner(), face.right_eye.corner());
        Self {
            nose_offset: offset,
            facing: offset.is_some_and(|o| o < facing_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT: Point2D = Point2D::new(100.0, 120.0);
    const RIGHT: Point2D = Point2D::new(200.0, 120.0);

    #[test]
    fn test_centered_nose_faces_camera() {
        let nose = Point2D::new(150.0, 170.0);
        assert_eq!(nose_offset(nose, LEFT, RIGHT), Some(0.0));
        assert!(is_facing_camera(nose, LEFT, RIGHT, 0.35));
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        // Span 100, offset 35 → exactly 0.35 → not facing
        let nose = Point2D::new(185.0, 170.0);
        assert!(!is_facing_camera(nose, LEFT, RIGHT, 0.35));
        let nose = Point2D::new(184.0, 170.0);
        assert!(is_facing_camera(nose, LEFT, RIGHT, 0.35));
    }

    #[test]
    fn test_offset_is_symmetric() {
        let left_turn = nose_offset(Point2D::new(120.0, 0.0), LEFT, RIGHT).unwrap();
        let right_turn = nose_offset(Point2D::new(180.0, 0.0), LEFT, RIGHT).unwrap();
        assert!((left_turn - right_turn).abs() < 1e-6);
        assert!((left_turn - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_nose_position_ignored() {
        let a = nose_offset(Point2D::new(160.0, 0.0), LEFT, RIGHT);
        let b = nose_offset(Point2D::new(160.0, 900.0), LEFT, RIGHT);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coincident_corners_fail_closed() {
        let nose = Point2D::new(100.0, 150.0);
        assert_eq!(nose_offset(nose, LEFT, LEFT), None);
        assert!(!is_facing_camera(nose, LEFT, LEFT, 0.35));
    }

    #[test]
    fn test_nan_fails_closed() {
        let nose = Point2D::new(f32::NAN, 150.0);
        assert!(!is_facing_camera(nose, LEFT, RIGHT, 0.35));
    }

    #[test]
    fn test_classify_face() {
        let eye = |c: Point2D| [c, c, c, Point2D::new(c.x + 20.0, c.y), c, c];
        let face = FaceLandmarks::new(&eye(LEFT), &eye(RIGHT), &[Point2D::new(150.0, 160.0)]).unwrap();
        let pose = HeadPose::classify(&face, 0.35);
        assert!(pose.facing);
        assert_eq!(pose.nose_offset, Some(0.0));
    }
}
