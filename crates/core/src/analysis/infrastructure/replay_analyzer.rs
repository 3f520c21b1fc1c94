use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::analysis::domain::analysis_result::AnalyzerOutput;
use crate::analysis::domain::analyzer_error::AnalyzerError;
use crate::analysis::domain::attribute_analyzer::{AnalysisRequest, FaceAttributeAnalyzer};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ReplayLoadError {
    #[error("failed to read replay file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid replay data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One recorded analyzer outcome: a payload, or a failure message.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ReplayEntry {
    Failure { error: String },
    Output(AnalyzerOutput),
}

/// Replays recorded analyzer outcomes by frame index.
///
/// The file is a JSON object keyed by frame index. Each value is the
/// analyzer payload for that frame (one face object or a list of them)
/// or `{"error": "..."}` to replay a failure. Frames without an entry
/// analyze to an empty face list.
pub struct ReplayAnalyzer {
    entries: HashMap<u64, ReplayEntry>,
}

impl ReplayAnalyzer {
    pub fn new(entries: HashMap<u64, ReplayEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayLoadError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayLoadError> {
        let json = std::fs::read_to_string(path).map_err(|e| ReplayLoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FaceAttributeAnalyzer for ReplayAnalyzer {
    fn analyze(
        &mut self,
        frame: &Frame,
        _request: &AnalysisRequest,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        match self.entries.get(&frame.index()) {
            Some(ReplayEntry::Output(output)) => Ok(output.clone()),
            Some(ReplayEntry::Failure { error }) => Err(AnalyzerError::Other(error.clone())),
            None => Ok(AnalyzerOutput::List(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::analysis_result::GenderField;
    use crate::shared::region::FaceRegion;
    use std::io::Write;

    const REPLAY: &str = r#"{
        "10": {"region": {"x": 1, "y": 2, "w": 3, "h": 4},
               "emotion": {"happy": 70, "sad": 20, "neutral": 10},
               "dominant_gender": "Man", "gender": {"Man": 88.0, "Woman": 12.0}},
        "20": [{"region": {"x": 5, "y": 5, "w": 5, "h": 5}, "emotion": {"angry": 50},
                "dominant_gender": "Woman", "gender": "Woman"},
               {"region": {"x": 9, "y": 9, "w": 9, "h": 9}, "emotion": {}}],
        "30": {"error": "Exception while downloading facial_expression_model_weights.h5"}
    }"#;

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, index)
    }

    #[test]
    fn test_replays_single_payload_for_frame() {
        let mut analyzer = ReplayAnalyzer::from_json(REPLAY).unwrap();
        let results = analyzer
            .analyze(&frame(10), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].region, FaceRegion::new(1, 2, 3, 4));
        assert_eq!(results[0].emotion.get("happy"), Some(70.0));
    }

    #[test]
    fn test_replays_list_payload_with_malformed_gender() {
        let mut analyzer = ReplayAnalyzer::from_json(REPLAY).unwrap();
        let results = analyzer
            .analyze(&frame(20), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].gender, GenderField::Unavailable);
        assert!(results[1].emotion.is_empty());
    }

    #[test]
    fn test_replays_failure_as_error() {
        let mut analyzer = ReplayAnalyzer::from_json(REPLAY).unwrap();
        let err = analyzer
            .analyze(&frame(30), &AnalysisRequest::default())
            .unwrap_err();

        assert!(err.is_download_related());
        assert!(err.model_hint().is_none());
    }

    #[test]
    fn test_unknown_frame_is_empty() {
        let mut analyzer = ReplayAnalyzer::from_json(REPLAY).unwrap();
        let output = analyzer
            .analyze(&frame(99), &AnalysisRequest::default())
            .unwrap();
        assert!(output.into_results().is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REPLAY.as_bytes()).unwrap();

        let analyzer = ReplayAnalyzer::from_file(file.path()).unwrap();
        assert_eq!(analyzer.len(), 3);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = ReplayAnalyzer::from_file(Path::new("/nonexistent/replay.json"));
        assert!(matches!(result, Err(ReplayLoadError::Read { .. })));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let result = ReplayAnalyzer::from_json(r#"{"10": 5}"#);
        assert!(matches!(result, Err(ReplayLoadError::Parse(_))));
    }
}
