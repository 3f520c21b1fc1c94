use crate::annotation::domain::attribute_aggregator::SeverityTier;
use crate::shared::region::FaceRegion;

/// One line of the ranked emotion list.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationLine {
    pub label: String,
    pub score: f64,
    pub tier: SeverityTier,
}

impl AnnotationLine {
    pub fn text(&self) -> String {
        format!("{}: {:.1}%", self.label, self.score)
    }
}

/// Everything the overlay draws for one face, already translated.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub region: FaceRegion,
    pub emotion: String,
    pub gender: String,
    pub gender_confidence: f64,
    pub lines: Vec<AnnotationLine>,
}

impl FaceAnnotation {
    pub fn headline(&self) -> String {
        self.emotion.to_uppercase()
    }

    pub fn gender_text(&self) -> String {
        format!("{} ({:.1}%)", self.gender, self.gender_confidence)
    }
}
