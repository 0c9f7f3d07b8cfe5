use serde::{Deserialize, Serialize};

/// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
pub type Landmarks = [(f32, f32); 5];

/// Face rectangle in pixel coordinates, in (top, right, bottom, left) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceLocation {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self { top, right, bottom, left }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// A face reported by a detector backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedFace {
    pub location: FaceLocation,
    pub confidence: f32,
    /// Present when the detector predicts keypoints; encoders use them for alignment.
    pub landmarks: Option<Landmarks>,
}

impl DetectedFace {
    /// A bare rectangle with no confidence or keypoints attached.
    pub fn from_location(location: FaceLocation) -> Self {
        Self { location, confidence: 1.0, landmarks: None }
    }
}

/// Face descriptor: the identity embedding produced by an encoder backend.
///
/// Serializes as a bare JSON array of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub values: Vec<f64>,
}

impl Descriptor {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean (L2) distance between two descriptors.
    ///
    /// Callers are responsible for checking that the lengths agree; extra
    /// trailing components are ignored.
    pub fn distance(&self, other: &Descriptor) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Population variance of the components (0.0 for an empty descriptor).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
    }
}

impl From<Vec<f64>> for Descriptor {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Outcome of a `compare` request, as printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Index into the known descriptors, or -1 when nothing is within tolerance.
    pub match_index: i64,
    pub distance: f64,
    pub is_match: bool,
}

impl ComparisonResult {
    /// The "no match, maximal distance" sentinel.
    pub fn no_match() -> Self {
        Self { match_index: -1, distance: 1.0, is_match: false }
    }
}
