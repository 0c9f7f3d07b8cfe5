//! Seams to the face detection and description engines.
//!
//! The pipeline only sees these traits; the ONNX implementations live in
//! [`crate::detector`] and [`crate::recognizer`].

use crate::types::{DetectedFace, Descriptor};
use image::RgbImage;

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Locates faces in an RGB image.
///
/// Implementations may hold inference sessions that need `&mut self`.
pub trait FaceDetector {
    /// Detected faces, best first, with locations clamped to the image bounds.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, BackendError>;
}

/// Turns detected faces into descriptors, one per face, in the same order.
pub trait FaceEncoder {
    fn encode(&mut self, image: &RgbImage, faces: &[DetectedFace]) -> Result<Vec<Descriptor>, BackendError>;
}
