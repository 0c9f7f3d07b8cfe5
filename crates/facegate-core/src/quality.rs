//! Heuristic quality gate for detections and descriptors.
//!
//! Detectors occasionally report spurious boxes and encoders produce
//! degenerate embeddings for blank or uniform regions. These checks reject
//! both using fixed thresholds from [`QualityPolicy`].

use crate::config::QualityPolicy;
use crate::types::{DetectedFace, Descriptor, FaceLocation};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QualityError {
    #[error("No face detected in image. Please ensure your face is clearly visible")]
    NoFace,
    #[error("Multiple faces detected. Please ensure only one person is in the image")]
    MultipleFaces(usize),
    #[error("Face too small for reliable recognition")]
    TooSmall,
    #[error("Face too close to image edge")]
    TooCloseToEdge,
    #[error("Unusual face aspect ratio")]
    UnusualAspect,
    #[error("Invalid face encoding generated")]
    InvalidEncoding,
    #[error("Low quality face encoding. Please try again with better lighting and positioning")]
    LowVariance,
}

impl QualityPolicy {
    /// Require exactly one detection and return it.
    pub fn single_face<'a>(&self, faces: &'a [DetectedFace]) -> Result<&'a DetectedFace, QualityError> {
        match faces {
            [] => Err(QualityError::NoFace),
            [face] => Ok(face),
            _ => Err(QualityError::MultipleFaces(faces.len())),
        }
    }

    /// Check size, edge margin and aspect ratio of `loc` within an image of
    /// `image_height` × `image_width`. Checks run in that order and the
    /// first failure wins.
    pub fn check_location(
        &self,
        loc: &FaceLocation,
        image_height: u32,
        image_width: u32,
    ) -> Result<(), QualityError> {
        let width = loc.width();
        let height = loc.height();

        if width < self.min_face_size || height < self.min_face_size {
            return Err(QualityError::TooSmall);
        }

        let margin = self.edge_margin as i64;
        if (loc.left as i64) < margin
            || (loc.top as i64) < margin
            || loc.right as i64 > image_width as i64 - margin
            || loc.bottom as i64 > image_height as i64 - margin
        {
            return Err(QualityError::TooCloseToEdge);
        }

        let aspect = width as f64 / height as f64;
        if aspect < self.min_aspect || aspect > self.max_aspect {
            return Err(QualityError::UnusualAspect);
        }

        Ok(())
    }

    /// Reject non-finite or near-constant descriptors. Accepted descriptors
    /// are returned unchanged.
    pub fn check_descriptor(&self, descriptor: Descriptor) -> Result<Descriptor, QualityError> {
        if descriptor.values.iter().any(|v| !v.is_finite()) {
            return Err(QualityError::InvalidEncoding);
        }
        if descriptor.variance() < self.min_variance {
            return Err(QualityError::LowVariance);
        }
        Ok(descriptor)
    }
}
