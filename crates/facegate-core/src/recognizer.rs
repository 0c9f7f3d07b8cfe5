//! ResNet face descriptor extraction via ONNX Runtime.
//!
//! Runs a dlib-compatible ResNet (`dlib_face_recognition_resnet_model_v1`
//! exported to ONNX) on 150×150 RGB face chips and returns its raw
//! 128-dimensional descriptor. In high-accuracy mode the descriptor is the
//! mean over several randomly jittered chips.

use crate::alignment::{self, Jitter, Similarity, CHIP_SIZE};
use crate::backend::{BackendError, FaceEncoder};
use crate::types::{DetectedFace, Descriptor};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;

/// Per-channel RGB means subtracted by the network's input layer.
const RESNET_CHANNEL_MEANS: [f32; 3] = [122.782, 117.001, 104.298];
const RESNET_SCALE: f32 = 256.0;
const RESNET_DESCRIPTOR_DIM: usize = 128;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} — download the dlib ResNet ONNX export and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Descriptor extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Number of jittered chips averaged per face; 0 or 1 disables jittering.
    pub num_jitters: usize,
    /// Seed for the jitter RNG, so repeated runs give identical descriptors.
    pub seed: u64,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self { num_jitters: crate::config::DEFAULT_NUM_JITTERS, seed: 0 }
    }
}

/// ResNet-based face encoder.
pub struct ResNetEncoder {
    session: Session,
    settings: EncoderSettings,
}

impl ResNetEncoder {
    /// Load the ResNet ONNX model from the given path.
    pub fn load(model_path: &str, settings: EncoderSettings) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            num_jitters = settings.num_jitters,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ResNet descriptor model"
        );

        Ok(Self { session, settings })
    }

    /// Extract a descriptor for one detected face.
    ///
    /// Faces with landmarks are aligned to the reference layout; otherwise the
    /// detection box is used as-is.
    pub fn extract(&mut self, image: &RgbImage, face: &DetectedFace) -> Result<Descriptor, RecognizerError> {
        let transform = match &face.landmarks {
            Some(landmarks) => alignment::landmark_transform(landmarks),
            None => alignment::box_transform(&face.location),
        };

        if self.settings.num_jitters <= 1 {
            let chip = alignment::extract_chip(image, &transform);
            let values = self.describe(&chip)?;
            return Ok(Descriptor::new(values.into_iter().map(f64::from).collect()));
        }

        self.extract_jittered(image, &transform)
    }

    fn extract_jittered(&mut self, image: &RgbImage, transform: &Similarity) -> Result<Descriptor, RecognizerError> {
        let n = self.settings.num_jitters;
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let mut sum = vec![0.0f64; RESNET_DESCRIPTOR_DIM];

        for _ in 0..n {
            let jitter = Jitter::sample(&mut rng);
            let chip = alignment::extract_jittered_chip(image, transform, &jitter);
            for (acc, v) in sum.iter_mut().zip(self.describe(&chip)?) {
                *acc += v as f64;
            }
        }

        tracing::debug!(samples = n, "averaged jittered descriptors");
        Ok(Descriptor::new(sum.into_iter().map(|v| v / n as f64).collect()))
    }

    /// Run the network on a single chip.
    fn describe(&mut self, chip: &RgbImage) -> Result<Vec<f32>, RecognizerError> {
        let input = Self::to_tensor(chip);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("descriptor extraction: {e}")))?;

        if raw.len() != RESNET_DESCRIPTOR_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {RESNET_DESCRIPTOR_DIM}-dim descriptor, got {}",
                raw.len()
            )));
        }
        Ok(raw.to_vec())
    }

    /// Convert a chip into a NCHW float tensor, mean-subtracted per channel.
    fn to_tensor(chip: &RgbImage) -> Array4<f32> {
        let size = CHIP_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, px) in chip.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (px.0[c] as f32 - RESNET_CHANNEL_MEANS[c]) / RESNET_SCALE;
            }
        }
        tensor
    }
}

impl FaceEncoder for ResNetEncoder {
    fn encode(&mut self, image: &RgbImage, faces: &[DetectedFace]) -> Result<Vec<Descriptor>, BackendError> {
        let mut descriptors = Vec::with_capacity(faces.len());
        for face in faces {
            descriptors.push(self.extract(image, face)?);
        }
        Ok(descriptors)
    }
}
