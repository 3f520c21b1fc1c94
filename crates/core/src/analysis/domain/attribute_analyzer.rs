use crate::shared::constants::DEFAULT_DETECTOR_BACKEND;
use crate::shared::frame::Frame;

use super::analysis_result::AnalyzerOutput;
use super::analyzer_error::AnalyzerError;

/// Face attributes an analyzer can be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Emotion,
    Gender,
}

/// Parameters passed along with every analyzer call.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub attributes: Vec<Attribute>,
    /// When false, a frame without faces yields neutral defaults instead
    /// of an error.
    pub enforce_detection: bool,
    pub detector_backend: String,
}

impl AnalysisRequest {
    pub fn wants(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            attributes: vec![Attribute::Emotion, Attribute::Gender],
            enforce_detection: false,
            detector_backend: DEFAULT_DETECTOR_BACKEND.to_string(),
        }
    }
}

/// Domain interface for the expensive per-frame face attribute analysis.
///
/// Implementations may be stateful (lazy model loading, replay cursors),
/// hence `&mut self`. Calls are synchronous and may block for a long time.
pub trait FaceAttributeAnalyzer: Send {
    fn analyze(
        &mut self,
        frame: &Frame,
        request: &AnalysisRequest,
    ) -> Result<AnalyzerOutput, AnalyzerError>;
}
