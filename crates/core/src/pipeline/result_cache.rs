use crate::analysis::domain::analysis_result::AnalysisResult;

/// Holds the most recent successful analysis, replaced wholesale on each set.
#[derive(Debug, Default)]
pub struct ResultCache {
    results: Option<Vec<AnalysisResult>>,
    generation: u64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first successful analysis.
    pub fn get(&self) -> Option<&[AnalysisResult]> {
        self.results.as_deref()
    }

    pub fn set(&mut self, results: Vec<AnalysisResult>) {
        self.results = Some(results);
        self.generation += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_none()
    }

    /// Number of successful sets so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::analysis_result::GenderField;
    use crate::analysis::domain::score_distribution::ScoreDistribution;
    use crate::shared::region::FaceRegion;

    fn face(x: i32) -> AnalysisResult {
        AnalysisResult {
            region: FaceRegion::new(x, 0, 10, 10),
            emotion: ScoreDistribution::new(),
            dominant_gender: "Man".to_string(),
            gender: GenderField::Unavailable,
        }
    }

    #[test]
    fn test_starts_empty() {
        let cache = ResultCache::new();
        assert!(cache.is_empty());
        assert!(cache.get().is_none());
        assert_eq!(cache.generation(), 0);
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let mut cache = ResultCache::new();
        cache.set(vec![face(1), face(2)]);
        cache.set(vec![face(3)]);

        let results = cache.get().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].region.x, 3);
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn test_empty_list_is_not_empty_cache() {
        let mut cache = ResultCache::new();
        cache.set(Vec::new());
        assert!(!cache.is_empty());
        assert_eq!(cache.get().map(|r| r.len()), Some(0));
    }
}
