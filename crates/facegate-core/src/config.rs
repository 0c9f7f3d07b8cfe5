//! Policy constants for quality gating and matching.

/// Minimum face width and height in pixels.
pub const DEFAULT_MIN_FACE_SIZE: i32 = 100;
/// Required distance between the face rectangle and every image edge.
pub const DEFAULT_EDGE_MARGIN: i32 = 20;
pub const DEFAULT_MIN_ASPECT: f64 = 0.7;
pub const DEFAULT_MAX_ASPECT: f64 = 1.3;
/// Descriptors with a population variance below this are treated as degenerate.
pub const DEFAULT_MIN_VARIANCE: f64 = 0.005;
/// Maximum descriptor distance that still counts as a match.
pub const DEFAULT_TOLERANCE: f64 = 0.3;
/// Number of perturbed samples averaged per descriptor in high-accuracy mode.
pub const DEFAULT_NUM_JITTERS: usize = 5;

/// Thresholds applied by the quality gate.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityPolicy {
    pub min_face_size: i32,
    pub edge_margin: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub min_variance: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            edge_margin: DEFAULT_EDGE_MARGIN,
            min_aspect: DEFAULT_MIN_ASPECT,
            max_aspect: DEFAULT_MAX_ASPECT,
            min_variance: DEFAULT_MIN_VARIANCE,
        }
    }
}
