//! ONNX attribute classifiers operating on RGB face crops.
//!
//! Both classifiers report percentages keyed by the analyzer vocabulary
//! (`angry`, `happy`, ... and `Man` / `Woman`) so downstream translation
//! and aggregation never see model-specific class names.
use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;

use crate::analysis::domain::analyzer_error::AnalyzerError;
use crate::analysis::domain::score_distribution::ScoreDistribution;

use super::execution_provider::build_session;
use super::onnx_attribute_analyzer::AttributeClassifier;

/// FER+ output order, mapped onto the analyzer vocabulary.
pub const FERPLUS_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];
const FERPLUS_INPUT_SIZE: u32 = 64;

/// GoogLeNet gender output order.
pub const GENDER_LABELS: [&str; 2] = ["Man", "Woman"];
const GENDER_INPUT_SIZE: u32 = 224;
/// Caffe-style per-channel means, BGR order.
const GENDER_MEANS_BGR: [f32; 3] = [104.0, 117.0, 123.0];

/// FER+ emotion classifier: 64x64 grayscale input, raw 0-255 pixel values.
pub struct FerPlusEmotionClassifier {
    session: ort::session::Session,
}

impl FerPlusEmotionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: build_session(model_path)?,
        })
    }
}

impl AttributeClassifier for FerPlusEmotionClassifier {
    fn classify(&mut self, face: &RgbImage) -> Result<ScoreDistribution, AnalyzerError> {
        let gray = image::imageops::grayscale(face);
        let resized = image::imageops::resize(
            &gray,
            FERPLUS_INPUT_SIZE,
            FERPLUS_INPUT_SIZE,
            FilterType::Triangle,
        );
        let size = FERPLUS_INPUT_SIZE as usize;
        let input = ndarray::Array4::from_shape_fn((1, 1, size, size), |(_, _, y, x)| {
            resized.get_pixel(x as u32, y as u32)[0] as f32
        });

        let raw = run_scores(&mut self.session, input)
            .map_err(|e| AnalyzerError::Inference(format!("emotion model: {e}")))?;
        label_scores(&FERPLUS_LABELS, &raw)
    }
}

/// GoogLeNet gender classifier: 224x224 BGR input, mean-subtracted.
pub struct GoogLeNetGenderClassifier {
    session: ort::session::Session,
}

impl GoogLeNetGenderClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: build_session(model_path)?,
        })
    }
}

impl AttributeClassifier for GoogLeNetGenderClassifier {
    fn classify(&mut self, face: &RgbImage) -> Result<ScoreDistribution, AnalyzerError> {
        let resized = image::imageops::resize(
            face,
            GENDER_INPUT_SIZE,
            GENDER_INPUT_SIZE,
            FilterType::Triangle,
        );
        let size = GENDER_INPUT_SIZE as usize;
        let input = ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            let px = resized.get_pixel(x as u32, y as u32);
            px[2 - c] as f32 - GENDER_MEANS_BGR[c]
        });

        let raw = run_scores(&mut self.session, input)
            .map_err(|e| AnalyzerError::Inference(format!("gender model: {e}")))?;
        label_scores(&GENDER_LABELS, &raw)
    }
}

fn run_scores(
    session: &mut ort::session::Session,
    input: ndarray::Array4<f32>,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input_value = ort::value::Tensor::from_array(input)?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() == 0 {
        return Err("model produced no outputs".into());
    }
    let tensor = outputs[0].try_extract_array::<f32>()?;
    Ok(tensor.iter().copied().collect())
}

/// Pairs model outputs with labels as percentages.
fn label_scores(labels: &[&str], raw: &[f32]) -> Result<ScoreDistribution, AnalyzerError> {
    if raw.len() != labels.len() {
        return Err(AnalyzerError::Inference(format!(
            "expected {} scores, model produced {}",
            labels.len(),
            raw.len()
        )));
    }
    Ok(labels
        .iter()
        .copied()
        .zip(to_percentages(raw))
        .collect())
}

/// Converts logits or probabilities to percentages summing to 100.
///
/// Outputs that already form a probability vector are only rescaled.
fn to_percentages(raw: &[f32]) -> Vec<f64> {
    let values: Vec<f64> = raw.iter().map(|&v| v as f64).collect();
    let sum: f64 = values.iter().sum();
    let is_probability = values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3;
    if is_probability {
        return values.iter().map(|v| v * 100.0).collect();
    }

    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let exp_sum: f64 = exp.iter().sum();
    exp.iter().map(|e| e / exp_sum * 100.0).collect()
}
