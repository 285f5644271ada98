//! Planar distance helpers over landmark points.

use crate::types::Point2D;

/// Euclidean distance between two points. Non-finite input yields NaN.
pub fn distance(p1: Point2D, p2: Point2D) -> f32 {
    ((p1.x - p2.x).powi(2) + (p1.y - p2.y).powi(2)).sqrt()
}

/// Horizontal midpoint of two points.
pub fn midpoint_x(p1: Point2D, p2: Point2D) -> f32 {
    (p1.x + p2.x) / 2.0
}
