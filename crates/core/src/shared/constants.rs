/// Analyze every Nth captured frame.
pub const SAMPLING_PERIOD: u64 = 10;

/// Download-classified analyzer failures tolerated before the loop halts.
pub const DOWNLOAD_FAILURE_THRESHOLD: u32 = 3;

/// Emotion class dropped from aggregation and display regardless of score.
pub const EXCLUDED_EMOTION: &str = "disgust";

/// Dominant emotion reported when every class was filtered out.
pub const FALLBACK_EMOTION: &str = "neutral";

/// Gender label shown when the analyzer returned no usable distribution.
pub const GENDER_UNAVAILABLE: &str = "N/A";

/// Scores strictly above this are tiered "high".
pub const HIGH_TIER_THRESHOLD: f64 = 50.0;

/// Scores strictly above this (and not high) are tiered "medium".
pub const MEDIUM_TIER_THRESHOLD: f64 = 20.0;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMOTION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EMOTION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

pub const GENDER_MODEL_NAME: &str = "gender_googlenet.onnx";
pub const GENDER_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/age_gender/models/gender_googlenet.onnx";

/// Detector backend name reported in analysis requests.
pub const DEFAULT_DETECTOR_BACKEND: &str = "yolo";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
