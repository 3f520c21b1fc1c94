pub mod analysis_result;
pub mod analyzer_error;
pub mod attribute_analyzer;
pub mod score_distribution;
