//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the RGB image into the network input, decodes the three
//! anchor-free stride heads, suppresses overlaps and maps boxes back to
//! clamped pixel rectangles.

use crate::backend::{BackendError, FaceDetector};
use crate::types::{DetectedFace, FaceLocation, Landmarks};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Letterbox placement of the source image inside the network input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, input: usize) -> Self {
        let scale = (input as f32 / width as f32).min(input as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((input as f32 - new_w) / 2.0).floor(),
            pad_y: ((input as f32 - new_h) / 2.0).floor(),
        }
    }

    /// Map a point from network input space back to the source image.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Decoded detection in source-image float coordinates.
#[derive(Debug, Clone)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    landmarks: Option<Landmarks>,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Round to whole pixels and clamp into a `width` × `height` image.
    fn into_face(self, width: u32, height: u32) -> DetectedFace {
        let clamp_x = |v: f32| (v.round() as i32).clamp(0, width as i32);
        let clamp_y = |v: f32| (v.round() as i32).clamp(0, height as i32);
        DetectedFace {
            location: FaceLocation {
                top: clamp_y(self.y1),
                right: clamp_x(self.x2),
                bottom: clamp_y(self.y2),
                left: clamp_x(self.x1),
            },
            confidence: self.score,
            landmarks: self.landmarks,
        }
    }
}

/// Output tensor indices for one stride: (score_idx, bbox_idx, kps_idx).
type StrideOutputIndices = (usize, usize, usize);

/// Standard export order: [scores 8/16/32, bboxes 8/16/32, kps 8/16/32].
const POSITIONAL_INDICES: [StrideOutputIndices; 3] = [(0, 3, 6), (1, 4, 7), (2, 5, 8)];

/// SCRFD-based face detector.
pub struct ScrfdDetector {
    session: Session,
    stride_indices: [StrideOutputIndices; 3],
}

impl ScrfdDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self { session, stride_indices })
    }

    /// Detect faces in an RGB image, best first.
    pub fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectorError::EmptyImage);
        }
        let (input, letterbox) = to_input_tensor(image, SCRFD_INPUT_SIZE);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;
            let (_, kps) = outputs[kps_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("kps stride {stride}: {e}")))?;

            candidates.extend(decode_stride(
                StrideOutputs { scores, bboxes, kps },
                stride,
                SCRFD_INPUT_SIZE,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        let kept = nms(candidates, SCRFD_NMS_THRESHOLD);
        tracing::debug!(count = kept.len(), "SCRFD detections after NMS");

        Ok(kept
            .into_iter()
            .map(|c| c.into_face(image.width(), image.height()))
            .collect())
    }
}

impl FaceDetector for ScrfdDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, BackendError> {
        Ok(self.detect_faces(image)?)
    }
}

/// Letterbox an RGB image into a normalized NCHW tensor of `size` × `size`.
///
/// Padding is filled with the mean, i.e. zero after normalization.
fn to_input_tensor(image: &RgbImage, size: usize) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::fit(image.width(), image.height(), size);
    let new_w = ((image.width() as f32 * letterbox.scale).round() as u32).clamp(1, size as u32);
    let new_h = ((image.height() as f32 * letterbox.scale).round() as u32).clamp(1, size as u32);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    let (ox, oy) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
    for (x, y, px) in resized.enumerate_pixels() {
        let (tx, ty) = (ox + x as usize, oy + y as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = (px.0[c] as f32 - SCRFD_MEAN) / SCRFD_STD;
        }
    }

    (tensor, letterbox)
}

/// Find (score, bbox, kps) outputs per stride by their `<head>_<stride>` names,
/// falling back to the standard positional layout.
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |head: &str, stride: usize| {
        let target = format!("{head}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let mut indices = POSITIONAL_INDICES;
    for (slot, &stride) in SCRFD_STRIDES.iter().enumerate() {
        match (find("score", stride), find("bbox", stride), find("kps", stride)) {
            (Some(s), Some(b), Some(k)) => indices[slot] = (s, b, k),
            _ => {
                tracing::info!(?names, "SCRFD: output names not recognized, using positional mapping");
                return POSITIONAL_INDICES;
            }
        }
    }
    indices
}

/// Raw head outputs for a single stride.
struct StrideOutputs<'a> {
    scores: &'a [f32],
    bboxes: &'a [f32],
    kps: &'a [f32],
}

/// Decode detections above `threshold` for a single stride level.
fn decode_stride(
    out: StrideOutputs<'_>,
    stride: usize,
    input_size: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<Candidate> {
    let grid = input_size / stride;
    let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let step = stride as f32;

    (0..num_anchors)
        .filter_map(|idx| {
            let score = out.scores.get(idx).copied().unwrap_or(0.0);
            if score <= threshold {
                return None;
            }

            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let ax = (cell % grid) as f32 * step;
            let ay = (cell / grid) as f32 * step;

            // distances from the anchor to the left, top, right and bottom edges
            let d = out.bboxes.get(idx * 4..idx * 4 + 4)?;
            let (x1, y1) = letterbox.unmap(ax - d[0] * step, ay - d[1] * step);
            let (x2, y2) = letterbox.unmap(ax + d[2] * step, ay + d[3] * step);

            let landmarks: Option<Landmarks> = out.kps.get(idx * 10..idx * 10 + 10).map(|k| {
                std::array::from_fn(|i| letterbox.unmap(ax + k[i * 2] * step, ay + k[i * 2 + 1] * step))
            });

            Some(Candidate { x1, y1, x2, y2, score, landmarks })
        })
        .collect()
}

/// Greedy non-maximum suppression; survivors are ordered by descending score.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates {
        if keep.iter().all(|k| iou(k, &c) <= iou_threshold) {
            keep.push(c);
        }
    }
    keep
}

/// Intersection-over-union of two candidates.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn cand(x: f32, y: f32, w: f32, h: f32, score: f32) -> Candidate {
        Candidate { x1: x, y1: y, x2: x + w, y2: y + h, score, landmarks: None }
    }

    const IDENTITY_LETTERBOX: Letterbox = Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };

    #[test]
    fn test_iou_identical() {
        let a = cand(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = cand(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = cand(20.0, 20.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial() {
        let a = cand(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = cand(5.0, 0.0, 10.0, 10.0, 1.0);
        // overlap 50, union 150
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let result = nms(
            vec![
                cand(5.0, 5.0, 100.0, 100.0, 0.8),
                cand(200.0, 200.0, 50.0, 50.0, 0.7),
                cand(0.0, 0.0, 100.0, 100.0, 0.9),
            ],
            0.4,
        );
        assert_eq!(result.len(), 2);
        assert!((result[0].score - 0.9).abs() < 1e-6);
        assert!((result[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_landscape() {
        let lb = Letterbox::fit(1280, 640, 640);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 160.0);
        let (x, y) = lb.unmap(100.0, 210.0);
        assert!((x - 200.0).abs() < 1e-4 && (y - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_input_tensor_padding_and_normalization() {
        let image = RgbImage::from_pixel(320, 160, Rgb([255, 127, 0]));
        let (tensor, lb) = to_input_tensor(&image, 64);
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(lb.pad_y, 16.0);
        // padded rows normalize to zero
        assert_eq!(tensor[[0, 0, 0, 10]], 0.0);
        // image rows carry the RGB values in channel order
        let r = tensor[[0, 0, 32, 32]];
        let g = tensor[[0, 1, 32, 32]];
        let b = tensor[[0, 2, 32, 32]];
        assert!((r - (255.0 - SCRFD_MEAN) / SCRFD_STD).abs() < 1e-6);
        assert!((g - (127.0 - SCRFD_MEAN) / SCRFD_STD).abs() < 1e-6);
        assert!((b - (0.0 - SCRFD_MEAN) / SCRFD_STD).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        // 32x32 input at stride 16: a 2x2 grid, 8 anchors
        let mut scores = vec![0.0f32; 8];
        let mut bboxes = vec![0.0f32; 32];
        let kps = vec![0.5f32; 80];
        // anchor 3 sits in cell 1 at (16, 0)
        scores[3] = 0.9;
        bboxes[12..16].copy_from_slice(&[0.5, 0.0, 1.0, 1.0]);

        let out = StrideOutputs { scores: &scores, bboxes: &bboxes, kps: &kps };
        let dets = decode_stride(out, 16, 32, &IDENTITY_LETTERBOX, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (8.0, 0.0, 32.0, 16.0));
        assert_eq!(d.landmarks.unwrap()[0], (24.0, 8.0));
    }

    #[test]
    fn test_decode_stride_threshold_exclusive() {
        let scores = vec![0.5f32; 8];
        let bboxes = vec![1.0f32; 32];
        let out = StrideOutputs { scores: &scores, bboxes: &bboxes, kps: &[] };
        assert!(decode_stride(out, 16, 32, &IDENTITY_LETTERBOX, 0.5).is_empty());
    }

    #[test]
    fn test_candidate_clamped_into_image() {
        let c = Candidate { x1: -4.4, y1: 10.6, x2: 700.2, y2: 300.4, score: 0.8, landmarks: None };
        let face = c.into_face(640, 480);
        assert_eq!(face.location, FaceLocation::new(11, 640, 300, 0));
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(discover_output_indices(&names), [(2, 0, 1), (5, 3, 4), (8, 6, 7)]);
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| (i + 448).to_string()).collect();
        assert_eq!(discover_output_indices(&names), POSITIONAL_INDICES);
    }

    #[test]
    fn test_load_missing_model() {
        let err = ScrfdDetector::load("/nonexistent/det_10g.onnx").err().unwrap();
        assert!(matches!(err, DetectorError::ModelNotFound(_)));
    }
}
