use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::model_cache::model_cache_dir;

/// Where a model artifact comes from and where the analyzer expects it.
///
/// Carried by download failures so the operator can fetch the file by hand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelHint {
    pub model_name: String,
    pub url: String,
    pub destination: PathBuf,
}

impl ModelHint {
    /// Hint for a model that belongs in the user model cache. Falls back to
    /// the bare file name when the platform has no cache directory.
    pub fn in_user_cache(name: &str, url: &str) -> Self {
        let destination = model_cache_dir()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|| PathBuf::from(name));
        Self {
            model_name: name.to_string(),
            url: url.to_string(),
            destination,
        }
    }
}

impl fmt::Display for ModelHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model_name, self.url)
    }
}

/// Failures raised by a [`FaceAttributeAnalyzer`](super::attribute_analyzer::FaceAttributeAnalyzer) call.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("model download failed for {hint}: {message}")]
    ModelDownload { hint: ModelHint, message: String },
    #[error("failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Other(String),
}

impl AnalyzerError {
    /// Download failures are the typed variant, or any failure whose
    /// message mentions "download" in any case.
    pub fn is_download_related(&self) -> bool {
        matches!(self, AnalyzerError::ModelDownload { .. })
            || self.to_string().to_lowercase().contains("download")
    }

    /// The model hint carried by a typed download failure.
    pub fn model_hint(&self) -> Option<&ModelHint> {
        match self {
            AnalyzerError::ModelDownload { hint, .. } => Some(hint),
            _ => None,
        }
    }
}
