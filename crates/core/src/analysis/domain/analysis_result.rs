use serde::de::IgnoredAny;
use serde::Deserialize;

use super::score_distribution::ScoreDistribution;
use crate::shared::region::FaceRegion;

/// Attributes for one detected face, as produced by a single analyzer call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisResult {
    pub region: FaceRegion,
    #[serde(default)]
    pub emotion: ScoreDistribution,
    #[serde(default)]
    pub dominant_gender: String,
    #[serde(default)]
    pub gender: GenderField,
}

/// Gender scores as reported by the analyzer.
///
/// Anything other than a label→score map deserializes to `Unavailable`
/// rather than failing the whole result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "RawGenderField")]
pub enum GenderField {
    Distribution(ScoreDistribution),
    #[default]
    Unavailable,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGenderField {
    Distribution(ScoreDistribution),
    Other(IgnoredAny),
}

impl From<RawGenderField> for GenderField {
    fn from(raw: RawGenderField) -> Self {
        match raw {
            RawGenderField::Distribution(dist) => GenderField::Distribution(dist),
            RawGenderField::Other(_) => GenderField::Unavailable,
        }
    }
}

/// What an analyzer call hands back: one bare result or a list of them.
///
/// Normalized to a sequence with [`AnalyzerOutput::into_results`] as soon
/// as it is received.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerOutput {
    List(Vec<AnalysisResult>),
    Single(AnalysisResult),
}

impl AnalyzerOutput {
    pub fn into_results(self) -> Vec<AnalysisResult> {
        match self {
            AnalyzerOutput::List(results) => results,
            AnalyzerOutput::Single(result) => vec![result],
        }
    }
}

impl From<Vec<AnalysisResult>> for AnalyzerOutput {
    fn from(results: Vec<AnalysisResult>) -> Self {
        AnalyzerOutput::List(results)
    }
}

impl From<AnalysisResult> for AnalyzerOutput {
    fn from(result: AnalysisResult) -> Self {
        AnalyzerOutput::Single(result)
    }
}
