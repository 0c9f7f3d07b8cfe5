//! The `encode` path: preprocess → detect → gate → encode → gate.

use crate::backend::{BackendError, FaceDetector, FaceEncoder};
use crate::config::QualityPolicy;
use crate::preprocess;
use crate::quality::QualityError;
use crate::types::Descriptor;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Error encoding face: cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error("Failed to generate face encoding. Please try again")]
    NoEncoding,
    #[error("Error encoding face: {0}")]
    Backend(BackendError),
}

/// Produce a gated descriptor for the single face in the image at `path`.
///
/// The enhanced image is preferred; when preprocessing fails the raw image is
/// used instead.
pub fn encode_file(
    path: &Path,
    detector: &mut dyn FaceDetector,
    encoder: &mut dyn FaceEncoder,
    policy: &QualityPolicy,
) -> Result<Descriptor, EncodeError> {
    let image = match preprocess::preprocess(path) {
        Some(img) => img,
        None => preprocess::load_raw(path).map_err(|source| EncodeError::Decode {
            path: path.display().to_string(),
            source,
        })?,
    };
    tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "image loaded");

    encode_image(&image, detector, encoder, policy)
}

/// Detect, gate and encode the single face in an already decoded image.
pub fn encode_image(
    image: &RgbImage,
    detector: &mut dyn FaceDetector,
    encoder: &mut dyn FaceEncoder,
    policy: &QualityPolicy,
) -> Result<Descriptor, EncodeError> {
    let faces = detector.detect(image).map_err(EncodeError::Backend)?;
    tracing::debug!(count = faces.len(), "faces detected");

    let face = policy.single_face(&faces)?;
    policy.check_location(&face.location, image.height(), image.width())?;

    let descriptors = encoder
        .encode(image, std::slice::from_ref(face))
        .map_err(EncodeError::Backend)?;
    let descriptor = descriptors.into_iter().next().ok_or(EncodeError::NoEncoding)?;
    tracing::debug!(dim = descriptor.len(), variance = descriptor.variance(), "descriptor produced");

    Ok(policy.check_descriptor(descriptor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectedFace, FaceLocation};
    use image::Rgb;

    struct FixedDetector(Vec<DetectedFace>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectedFace>, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectedFace>, BackendError> {
            Err("session exploded".into())
        }
    }

    /// Returns the configured descriptors and counts calls.
    struct FixedEncoder {
        output: Vec<Descriptor>,
        calls: usize,
    }

    impl FixedEncoder {
        fn new(output: Vec<Descriptor>) -> Self {
            Self { output, calls: 0 }
        }
    }

    impl FaceEncoder for FixedEncoder {
        fn encode(&mut self, _image: &RgbImage, faces: &[DetectedFace]) -> Result<Vec<Descriptor>, BackendError> {
            assert_eq!(faces.len(), 1);
            self.calls += 1;
            Ok(self.output.clone())
        }
    }

    fn image() -> RgbImage {
        RgbImage::from_pixel(640, 480, Rgb([120, 110, 100]))
    }

    fn good_face() -> DetectedFace {
        DetectedFace::from_location(FaceLocation::new(140, 420, 340, 220))
    }

    fn good_descriptor() -> Descriptor {
        Descriptor::new((0..128).map(|i| (i as f64 - 64.0) / 200.0).collect())
    }

    fn run(faces: Vec<DetectedFace>, encoder: &mut FixedEncoder) -> Result<Descriptor, EncodeError> {
        let mut detector = FixedDetector(faces);
        encode_image(&image(), &mut detector, encoder, &QualityPolicy::default())
    }

    #[test]
    fn test_single_good_face() {
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let descriptor = run(vec![good_face()], &mut encoder).unwrap();
        assert_eq!(descriptor, good_descriptor());
        assert_eq!(encoder.calls, 1);
    }

    #[test]
    fn test_no_face() {
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let err = run(vec![], &mut encoder).unwrap_err();
        assert!(matches!(err, EncodeError::Quality(QualityError::NoFace)));
        assert_eq!(encoder.calls, 0);
    }

    #[test]
    fn test_multiple_faces_regardless_of_geometry() {
        let tiny = DetectedFace::from_location(FaceLocation::new(0, 10, 10, 0));
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let err = run(vec![good_face(), tiny], &mut encoder).unwrap_err();
        assert!(matches!(err, EncodeError::Quality(QualityError::MultipleFaces(2))));
        assert!(err.to_string().starts_with("Multiple faces detected"));
        assert_eq!(encoder.calls, 0);
    }

    #[test]
    fn test_geometry_rejected_before_encoding() {
        let edge = DetectedFace::from_location(FaceLocation::new(5, 205, 205, 5));
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let err = run(vec![edge], &mut encoder).unwrap_err();
        assert!(matches!(err, EncodeError::Quality(QualityError::TooCloseToEdge)));
        assert_eq!(encoder.calls, 0);
    }

    #[test]
    fn test_degenerate_descriptor_rejected() {
        let flat = Descriptor::new(vec![0.01; 128]);
        let mut encoder = FixedEncoder::new(vec![flat]);
        let err = run(vec![good_face()], &mut encoder).unwrap_err();
        assert!(matches!(err, EncodeError::Quality(QualityError::LowVariance)));
    }

    #[test]
    fn test_empty_encoder_output() {
        let mut encoder = FixedEncoder::new(vec![]);
        let err = run(vec![good_face()], &mut encoder).unwrap_err();
        assert!(matches!(err, EncodeError::NoEncoding));
    }

    #[test]
    fn test_backend_failure_message() {
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let err = encode_image(&image(), &mut FailingDetector, &mut encoder, &QualityPolicy::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error encoding face: session exploded");
    }

    #[test]
    fn test_unreadable_file() {
        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let mut detector = FixedDetector(vec![good_face()]);
        let err = encode_file(
            Path::new("/nonexistent/facegate/face.jpg"),
            &mut detector,
            &mut encoder,
            &QualityPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::Decode { .. }));
        assert!(err.to_string().starts_with("Error encoding face:"));
    }

    #[test]
    fn test_encode_file_uses_image_dimensions() {
        let path = std::env::temp_dir().join(format!("facegate-pipeline-{}.png", std::process::id()));
        image().save(&path).unwrap();

        let mut encoder = FixedEncoder::new(vec![good_descriptor()]);
        let mut detector = FixedDetector(vec![good_face()]);
        let result = encode_file(&path, &mut detector, &mut encoder, &QualityPolicy::default());
        std::fs::remove_file(&path).ok();

        assert_eq!(result.unwrap(), good_descriptor());
    }
}
