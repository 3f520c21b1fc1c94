use crate::analysis::domain::analysis_result::{AnalysisResult, GenderField};
use crate::analysis::domain::score_distribution::ScoreDistribution;
use crate::annotation::domain::face_annotation::{AnnotationLine, FaceAnnotation};
use crate::annotation::domain::label_translator::{LabelSpace, LabelTranslator};
use crate::shared::constants::{
    EXCLUDED_EMOTION, FALLBACK_EMOTION, GENDER_UNAVAILABLE, HIGH_TIER_THRESHOLD,
    MEDIUM_TIER_THRESHOLD,
};

/// Display bucket for a score. Presentation metadata only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeverityTier {
    High,
    Medium,
    Low,
}

impl SeverityTier {
    /// `> 50` is high, `> 20` is medium, anything else is low.
    pub fn for_score(score: f64) -> Self {
        if score > HIGH_TIER_THRESHOLD {
            SeverityTier::High
        } else if score > MEDIUM_TIER_THRESHOLD {
            SeverityTier::Medium
        } else {
            SeverityTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::High => "high",
            SeverityTier::Medium => "medium",
            SeverityTier::Low => "low",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedScore {
    pub label: String,
    pub score: f64,
    pub tier: SeverityTier,
}

/// Dominant class and ranking of one filtered distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub dominant: String,
    /// `None` when every class was filtered out and `dominant` is the fallback.
    pub dominant_score: Option<f64>,
    pub ranked: Vec<RankedScore>,
}

/// Classes removed from every emotion aggregation by default.
pub fn default_exclusions() -> Vec<String> {
    vec![EXCLUDED_EMOTION.to_string()]
}

/// Filters, picks the arg-max and ranks a score distribution.
///
/// Ties on the maximum go to the entry that comes first in distribution
/// order; ranking is a stable descending sort, so equal scores keep that
/// order too. An empty filtered set yields the neutral fallback.
pub fn aggregate(scores: &ScoreDistribution, excluded: &[String]) -> Aggregate {
    let kept: Vec<(&str, f64)> = scores
        .iter()
        .filter(|(label, _)| !excluded.iter().any(|e| e == label))
        .collect();

    let mut dominant: Option<(&str, f64)> = None;
    for &(label, score) in &kept {
        if dominant.map_or(true, |(_, best)| score > best) {
            dominant = Some((label, score));
        }
    }

    let mut ranked: Vec<RankedScore> = kept
        .iter()
        .map(|&(label, score)| RankedScore {
            label: label.to_string(),
            score,
            tier: SeverityTier::for_score(score),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    match dominant {
        Some((label, score)) => Aggregate {
            dominant: label.to_string(),
            dominant_score: Some(score),
            ranked,
        },
        None => Aggregate {
            dominant: FALLBACK_EMOTION.to_string(),
            dominant_score: None,
            ranked,
        },
    }
}

/// Raw dominant gender label and its confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct GenderReading {
    pub label: String,
    pub confidence: f64,
}

/// Reads the analyzer-reported dominant gender; no arg-max is recomputed.
///
/// A missing score for the dominant label reads as 0. A result without a
/// gender distribution reads as the "N/A" sentinel.
pub fn read_gender(result: &AnalysisResult) -> GenderReading {
    match &result.gender {
        GenderField::Distribution(dist) => GenderReading {
            label: result.dominant_gender.clone(),
            confidence: dist.get(&result.dominant_gender).unwrap_or(0.0),
        },
        GenderField::Unavailable => GenderReading {
            label: GENDER_UNAVAILABLE.to_string(),
            confidence: 0.0,
        },
    }
}

/// Builds the translated, display-ready annotation for one face.
pub fn annotate(
    result: &AnalysisResult,
    translator: &LabelTranslator,
    excluded: &[String],
) -> FaceAnnotation {
    let agg = aggregate(&result.emotion, excluded);
    let gender = read_gender(result);

    FaceAnnotation {
        region: result.region,
        emotion: translator.translate(LabelSpace::Emotion, &agg.dominant),
        gender: translator.translate(LabelSpace::Gender, &gender.label),
        gender_confidence: gender.confidence,
        lines: agg
            .ranked
            .into_iter()
            .map(|r| AnnotationLine {
                label: translator.translate(LabelSpace::Emotion, &r.label),
                score: r.score,
                tier: r.tier,
            })
            .collect(),
    }
}
