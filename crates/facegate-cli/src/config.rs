use facegate_core::config::DEFAULT_TOLERANCE;
use facegate_core::{EncoderSettings, QualityPolicy, DETECTOR_MODEL_FILE, ENCODER_MODEL_FILE};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Quality gate thresholds.
    pub policy: QualityPolicy,
    /// Match tolerance used by `compare` when none is given on the command line.
    pub tolerance: f64,
    pub encoder: EncoderSettings,
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = QualityPolicy::default();
        let encoder_defaults = EncoderSettings::default();

        let model_dir = lookup("FACEGATE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(facegate_core::default_model_dir);

        Self {
            model_dir,
            policy: QualityPolicy {
                min_face_size: parse_or(&lookup, "FACEGATE_MIN_FACE_SIZE", defaults.min_face_size),
                edge_margin: parse_or(&lookup, "FACEGATE_EDGE_MARGIN", defaults.edge_margin),
                min_aspect: parse_or(&lookup, "FACEGATE_MIN_ASPECT", defaults.min_aspect),
                max_aspect: parse_or(&lookup, "FACEGATE_MAX_ASPECT", defaults.max_aspect),
                min_variance: parse_or(&lookup, "FACEGATE_MIN_VARIANCE", defaults.min_variance),
            },
            tolerance: parse_or(&lookup, "FACEGATE_TOLERANCE", DEFAULT_TOLERANCE),
            encoder: EncoderSettings {
                num_jitters: parse_or(&lookup, "FACEGATE_NUM_JITTERS", encoder_defaults.num_jitters),
                seed: parse_or(&lookup, "FACEGATE_JITTER_SEED", encoder_defaults.seed),
            },
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(DETECTOR_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ResNet descriptor model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join(ENCODER_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
