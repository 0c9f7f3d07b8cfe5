//! facegate-core: face descriptor extraction and matching.
//!
//! Detection (SCRFD) and description (dlib-compatible ResNet) run through
//! ONNX Runtime behind the [`backend`] traits. This crate adds the image
//! preprocessing, the quality gate and the distance-based matcher.

pub mod alignment;
pub mod backend;
pub mod config;
pub mod detector;
pub mod matcher;
pub mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod recognizer;
pub mod types;

use std::path::PathBuf;

pub use backend::{FaceDetector, FaceEncoder};
pub use config::QualityPolicy;
pub use detector::ScrfdDetector;
pub use matcher::{EuclideanMatcher, MatchOutcome, Matcher};
pub use pipeline::EncodeError;
pub use recognizer::{EncoderSettings, ResNetEncoder};
pub use types::{ComparisonResult, DetectedFace, Descriptor, FaceLocation};

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the ResNet descriptor model inside the model directory.
pub const ENCODER_MODEL_FILE: &str = "dlib_face_recognition_resnet_model_v1.onnx";

/// Default model directory: `$XDG_DATA_HOME/facegate/models`, falling back to
/// `~/.local/share/facegate/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facegate")
        .join("models")
}
