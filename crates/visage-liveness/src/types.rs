use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of contour points per eye (corner, upper-outer, upper-inner,
/// corner, lower-inner, lower-outer).
pub const EYE_POINTS: usize = 6;

/// Number of points in the iBUG-300W 68-point layout.
pub const FACE_68_POINTS: usize = 68;

// 68-point layout ranges (half-open).
const LEFT_EYE_68: std::ops::Range<usize> = 36..42;
const RIGHT_EYE_68: std::ops::Range<usize> = 42..48;
const NOSE_68: std::ops::Range<usize> = 27..36;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("{eye} eye has {actual} points, expected 6")]
    EyePointCount { eye: &'static str, actual: usize },
    #[error("nose landmark sequence is empty")]
    EmptyNose,
    #[error("68-point landmark set has {0} points")]
    FacePointCount(usize),
}

/// A 2D landmark position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Uniformly scale both coordinates about the origin.
    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

/// Six eye-contour points in fixed anatomical order.
///
/// Index 0 and 3 are the horizontal corners; 1/5 and 2/4 are the vertical
/// upper/lower pairs. The EAR formula relies on this order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks(pub [Point2D; EYE_POINTS]);

impl EyeLandmarks {
    pub fn points(&self) -> &[Point2D; EYE_POINTS] {
        &self.0
    }

    /// Outer corner used for head-pose estimation (position 0).
    pub fn corner(&self) -> Point2D {
        self.0[0]
    }

    fn from_slice(eye: &'static str, points: &[Point2D]) -> Result<Self, LandmarkError> {
        let arr: [Point2D; EYE_POINTS] = points
            .try_into()
            .map_err(|_| LandmarkError::EyePointCount { eye, actual: points.len() })?;
        Ok(Self(arr))
    }
}

/// Validated landmark set for a single face in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    pub left_eye: EyeLandmarks,
    pub right_eye: EyeLandmarks,
    nose: Vec<Point2D>,
}

impl FaceLandmarks {
    /// Build from per-region point sequences, checking their shape.
    pub fn new(
        left_eye: &[Point2D],
        right_eye: &[Point2D],
        nose: &[Point2D],
    ) -> Result<Self, LandmarkError> {
        if nose.is_empty() {
            return Err(LandmarkError::EmptyNose);
        }
        Ok(Self {
            left_eye: EyeLandmarks::from_slice("left", left_eye)?,
            right_eye: EyeLandmarks::from_slice("right", right_eye)?,
            nose: nose.to_vec(),
        })
    }

    /// Build from a 68-point iBUG-300W landmark set.
    pub fn from_68_points(points: &[Point2D]) -> Result<Self, LandmarkError> {
        if points.len() != FACE_68_POINTS {
            return Err(LandmarkError::FacePointCount(points.len()));
        }
        Self::new(&points[LEFT_EYE_68], &points[RIGHT_EYE_68], &points[NOSE_68])
    }

    /// Nose tip (first nose point).
    pub fn nose_tip(&self) -> Point2D {
        self.nose[0]
    }

    pub fn nose(&self) -> &[Point2D] {
        &self.nose
    }

    /// Uniformly scale every landmark.
    pub fn scaled(&self, k: f32) -> Self {
        let scale_eye = |e: &EyeLandmarks| EyeLandmarks(e.0.map(|p| p.scaled(k)));
        Self {
            left_eye: scale_eye(&self.left_eye),
            right_eye: scale_eye(&self.right_eye),
            nose: self.nose.iter().map(|p| p.scaled(k)).collect(),
        }
    }
}

/// Landmarks as delivered by the extraction collaborator, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFace {
    Regions {
        left_eye: Vec<Point2D>,
        right_eye: Vec<Point2D>,
        nose: Vec<Point2D>,
    },
    Points68 {
        landmarks: Vec<Point2D>,
    },
}

impl TryFrom<&RawFace> for FaceLandmarks {
    type Error = LandmarkError;

    fn try_from(raw: &RawFace) -> Result<Self, Self::Error> {
        match raw {
            RawFace::Regions { left_eye, right_eye, nose } => {
                FaceLandmarks::new(left_eye, right_eye, nose)
            }
            RawFace::Points68 { landmarks } => FaceLandmarks::from_68_points(landmarks),
        }
    }
}

impl From<&FaceLandmarks> for RawFace {
    fn from(face: &FaceLandmarks) -> Self {
        RawFace::Regions {
            left_eye: face.left_eye.0.to_vec(),
            right_eye: face.right_eye.0.to_vec(),
            nose: face.nose.clone(),
        }
    }
}

/// Per-frame liveness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    NoFace,
    Tracking,
    Live,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Verdict::NoFace => "NO_FACE",
            Verdict::Tracking => "TRACKING",
            Verdict::Live => "LIVE",
        })
    }
}

/// What the verdict consumer receives for every processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub verdict: Verdict,
    pub blink_count: u32,
    pub is_facing_camera: bool,
    /// Mean EAR of both eyes; `None` when the eye geometry was degenerate
    /// or no face was processed.
    pub avg_ear: Option<f32>,
    /// Horizontal nose offset relative to eye span; `None` when indeterminate.
    pub nose_offset: Option<f32>,
    /// True when this frame began a new blink.
    pub blink_onset: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> Vec<Point2D> {
        (0..6).map(|i| Point2D::new(i as f32, 0.0)).collect()
    }

    #[test]
    fn test_face_from_regions() {
        let face = FaceLandmarks::new(&eye(), &eye(), &[Point2D::new(3.0, 4.0)]).unwrap();
        assert_eq!(face.nose_tip(), Point2D::new(3.0, 4.0));
        assert_eq!(face.left_eye.corner(), Point2D::new(0.0, 0.0));
    }

    #[test]
    fn test_short_eye_rejected() {
        let err = FaceLandmarks::new(&eye()[..5], &eye(), &[Point2D::default()]).unwrap_err();
        assert_eq!(err, LandmarkError::EyePointCount { eye: "left", actual: 5 });
    }

    #[test]
    fn test_long_eye_rejected() {
        let mut right = eye();
        right.push(Point2D::default());
        let err = FaceLandmarks::new(&eye(), &right, &[Point2D::default()]).unwrap_err();
        assert_eq!(err, LandmarkError::EyePointCount { eye: "right", actual: 7 });
    }

    #[test]
    fn test_empty_nose_rejected() {
        let err = FaceLandmarks::new(&eye(), &eye(), &[]).unwrap_err();
        assert_eq!(err, LandmarkError::EmptyNose);
    }

    #[test]
    fn test_68_point_layout() {
        let points: Vec<Point2D> = (0..68).map(|i| Point2D::new(i as f32, 0.0)).collect();
        let face = FaceLandmarks::from_68_points(&points).unwrap();
        assert_eq!(face.left_eye.corner().x, 36.0);
        assert_eq!(face.right_eye.corner().x, 42.0);
        assert_eq!(face.nose_tip().x, 27.0);
        assert_eq!(face.nose().len(), 9);
    }

    #[test]
    fn test_68_point_wrong_count() {
        let points = vec![Point2D::default(); 67];
        assert_eq!(
            FaceLandmarks::from_68_points(&points).unwrap_err(),
            LandmarkError::FacePointCount(67)
        );
    }

    #[test]
    fn test_raw_face_json_forms() {
        let regions = r#"{"left_eye":[{"x":0,"y":0},{"x":1,"y":0},{"x":2,"y":0},{"x":3,"y":0},{"x":4,"y":0},{"x":5,"y":0}],
            "right_eye":[{"x":0,"y":0},{"x":1,"y":0},{"x":2,"y":0},{"x":3,"y":0},{"x":4,"y":0},{"x":5,"y":0}],
            "nose":[{"x":1.5,"y":2.5}]}"#;
        let raw: RawFace = serde_json::from_str(regions).unwrap();
        assert!(matches!(raw, RawFace::Regions { .. }));
        assert!(FaceLandmarks::try_from(&raw).is_ok());

        let points: Vec<Point2D> = vec![Point2D::default(); 68];
        let json = serde_json::json!({ "landmarks": points }).to_string();
        let raw: RawFace = serde_json::from_str(&json).unwrap();
        assert!(matches!(raw, RawFace::Points68 { .. }));
    }

    #[test]
    fn test_verdict_serializes_screaming() {
        assert_eq!(serde_json::to_string(&Verdict::NoFace).unwrap(), "\"NO_FACE\"");
        assert_eq!(serde_json::to_string(&Verdict::Live).unwrap(), "\"LIVE\"");
        assert_eq!(Verdict::Tracking.to_string(), "TRACKING");
    }
}
