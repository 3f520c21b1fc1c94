use std::cell::Cell;
use std::path::PathBuf;

use image::RgbImage;

use crate::analysis::domain::analysis_result::{AnalysisResult, AnalyzerOutput, GenderField};
use crate::analysis::domain::analyzer_error::AnalyzerError;
use crate::analysis::domain::attribute_analyzer::{
    AnalysisRequest, Attribute, FaceAttributeAnalyzer,
};
use crate::analysis::domain::score_distribution::ScoreDistribution;
use crate::shared::constants::{
    EMOTION_MODEL_NAME, EMOTION_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL, GENDER_MODEL_NAME,
    GENDER_MODEL_URL,
};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::model_store::{ModelSource, ModelStore};
use super::onnx_classifiers::{FerPlusEmotionClassifier, GoogLeNetGenderClassifier};
use super::yolo_face_locator::YoloFaceLocator;

/// Finds face boxes in a frame.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, AnalyzerError>;
}

/// Scores one face crop over a fixed label set.
pub trait AttributeClassifier: Send {
    fn classify(&mut self, face: &RgbImage) -> Result<ScoreDistribution, AnalyzerError>;
}

/// The three models an analysis needs, once resolved and loaded.
pub struct AttributeModels {
    pub locator: Box<dyn FaceLocator>,
    pub emotion: Box<dyn AttributeClassifier>,
    pub gender: Box<dyn AttributeClassifier>,
}

/// Produces [`AttributeModels`], possibly downloading weights first.
pub type ModelLoader = Box<dyn FnMut() -> Result<AttributeModels, AnalyzerError> + Send>;

/// Emotion + gender analyzer backed by ONNX models.
///
/// Models are loaded on the first `analyze` call rather than at
/// construction, so a missing or undownloadable model surfaces as an
/// analyzer failure on every sampled frame until it is resolved.
pub struct OnnxAttributeAnalyzer {
    loader: ModelLoader,
    models: Option<AttributeModels>,
}

impl OnnxAttributeAnalyzer {
    /// Analyzer whose models come from the user cache, `bundled_dir`, or a
    /// download, in that order.
    pub fn new(bundled_dir: Option<PathBuf>, confidence: f64) -> Self {
        Self::with_loader(onnx_model_loader(ModelStore::new(bundled_dir), confidence))
    }

    pub fn with_loader(loader: ModelLoader) -> Self {
        Self {
            loader,
            models: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }

    /// Loads the models now instead of on the first analysis.
    ///
    /// A failure leaves the analyzer unloaded, so the next `analyze` call
    /// tries again.
    pub fn warm_up(&mut self) -> Result<(), AnalyzerError> {
        self.models().map(|_| ())
    }

    fn models(&mut self) -> Result<&mut AttributeModels, AnalyzerError> {
        if self.models.is_none() {
            log::info!("Loading face attribute models");
            self.models = Some((self.loader)()?);
        }
        self.models
            .as_mut()
            .ok_or_else(|| AnalyzerError::Other("models unavailable after load".to_string()))
    }
}

impl FaceAttributeAnalyzer for OnnxAttributeAnalyzer {
    fn analyze(
        &mut self,
        frame: &Frame,
        request: &AnalysisRequest,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        let models = self.models()?;
        let image = frame_image(frame)?;

        let mut regions = models.locator.locate(frame)?;
        if regions.is_empty() {
            if request.enforce_detection {
                return Err(AnalyzerError::Detection(
                    "Face could not be detected in the frame".to_string(),
                ));
            }
            regions.push(FaceRegion::full_frame(frame.width(), frame.height()));
        }

        let mut results = Vec::with_capacity(regions.len());
        for region in regions {
            let Some(visible) = region.clamped(frame.width(), frame.height()) else {
                continue;
            };
            let face = image::imageops::crop_imm(
                &image,
                visible.x as u32,
                visible.y as u32,
                visible.width as u32,
                visible.height as u32,
            )
            .to_image();

            let emotion = if request.wants(Attribute::Emotion) {
                models.emotion.classify(&face)?
            } else {
                ScoreDistribution::new()
            };
            let (dominant_gender, gender) = if request.wants(Attribute::Gender) {
                let scores = models.gender.classify(&face)?;
                (arg_max(&scores).unwrap_or_default(), GenderField::Distribution(scores))
            } else {
                (String::new(), GenderField::Unavailable)
            };

            results.push(AnalysisResult {
                region: visible,
                emotion,
                dominant_gender,
                gender,
            });
        }

        Ok(AnalyzerOutput::List(results))
    }
}

fn frame_image(frame: &Frame) -> Result<RgbImage, AnalyzerError> {
    if frame.channels() != 3 {
        return Err(AnalyzerError::InvalidInput(format!(
            "expected an RGB frame, got {} channels",
            frame.channels()
        )));
    }
    RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| AnalyzerError::InvalidInput("frame data does not match dimensions".into()))
}

/// First label with the highest score.
fn arg_max(scores: &ScoreDistribution) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (label, score) in scores.iter() {
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((label, score));
        }
    }
    best.map(|(label, _)| label.to_string())
}

const FACE_MODEL: ModelSource = ModelSource {
    name: FACE_MODEL_NAME,
    url: FACE_MODEL_URL,
};
const EMOTION_MODEL: ModelSource = ModelSource {
    name: EMOTION_MODEL_NAME,
    url: EMOTION_MODEL_URL,
};
const GENDER_MODEL: ModelSource = ModelSource {
    name: GENDER_MODEL_NAME,
    url: GENDER_MODEL_URL,
};

/// Loader that fetches and opens the YOLO, FER+ and GoogLeNet models.
pub fn onnx_model_loader(store: ModelStore, confidence: f64) -> ModelLoader {
    Box::new(move || {
        let face_path = fetch(&store, &FACE_MODEL)?;
        let emotion_path = fetch(&store, &EMOTION_MODEL)?;
        let gender_path = fetch(&store, &GENDER_MODEL)?;

        Ok(AttributeModels {
            locator: Box::new(
                YoloFaceLocator::new(&face_path, confidence)
                    .map_err(|e| load_error(FACE_MODEL_NAME, e))?,
            ),
            emotion: Box::new(
                FerPlusEmotionClassifier::new(&emotion_path)
                    .map_err(|e| load_error(EMOTION_MODEL_NAME, e))?,
            ),
            gender: Box::new(
                GoogLeNetGenderClassifier::new(&gender_path)
                    .map_err(|e| load_error(GENDER_MODEL_NAME, e))?,
            ),
        })
    })
}

fn fetch(store: &ModelStore, source: &ModelSource) -> Result<PathBuf, AnalyzerError> {
    log::info!("Resolving model: {}", source.name);
    let last_decile = Cell::new(0);
    let report = |done: u64, total: u64| {
        if total == 0 {
            return;
        }
        let decile = done * 10 / total;
        if decile > last_decile.replace(decile) {
            log::info!("Downloading {}... {}%", source.name, decile * 10);
        }
    };
    store.fetch(source, Some(&report))
}

fn load_error(name: &str, err: Box<dyn std::error::Error>) -> AnalyzerError {
    AnalyzerError::ModelLoad {
        model: name.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::analyzer_error::ModelHint;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubLocator {
        regions: Vec<FaceRegion>,
    }

    impl FaceLocator for StubLocator {
        fn locate(&mut self, _frame: &Frame) -> Result<Vec<FaceRegion>, AnalyzerError> {
            Ok(self.regions.clone())
        }
    }

    struct StubClassifier {
        scores: Vec<(&'static str, f64)>,
        crop_sizes: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StubClassifier {
        fn new(scores: Vec<(&'static str, f64)>) -> Self {
            Self {
                scores,
                crop_sizes: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl AttributeClassifier for StubClassifier {
        fn classify(&mut self, face: &RgbImage) -> Result<ScoreDistribution, AnalyzerError> {
            self.crop_sizes
                .lock()
                .unwrap()
                .push((face.width(), face.height()));
            Ok(self.scores.iter().copied().collect())
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 100 * 80 * 3], 100, 80, 3, 10)
    }

    fn loader_with(regions: Vec<FaceRegion>, gender: Vec<(&'static str, f64)>) -> ModelLoader {
        Box::new(move || {
            Ok(AttributeModels {
                locator: Box::new(StubLocator {
                    regions: regions.clone(),
                }),
                emotion: Box::new(StubClassifier::new(vec![("happy", 80.0), ("sad", 20.0)])),
                gender: Box::new(StubClassifier::new(gender.clone())),
            })
        })
    }

    #[test]
    fn test_models_load_lazily_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let mut inner = loader_with(vec![FaceRegion::new(0, 0, 10, 10)], vec![("Man", 60.0)]);
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            inner()
        }));

        assert!(!analyzer.is_loaded());
        analyzer.analyze(&frame(), &AnalysisRequest::default()).unwrap();
        analyzer.analyze(&frame(), &AnalysisRequest::default()).unwrap();

        assert!(analyzer.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried_on_next_call() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AnalyzerError::ModelDownload {
                hint: ModelHint::in_user_cache("emotion.onnx", "https://example.com/emotion.onnx"),
                message: "offline".to_string(),
            })
        }));

        for _ in 0..3 {
            let err = analyzer
                .analyze(&frame(), &AnalysisRequest::default())
                .unwrap_err();
            assert!(err.is_download_related());
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!analyzer.is_loaded());
    }

    #[test]
    fn test_no_face_without_enforcement_yields_full_frame_result() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(vec![], vec![("Man", 60.0)]));

        let results = analyzer
            .analyze(&frame(), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].region, FaceRegion::full_frame(100, 80));
    }

    #[test]
    fn test_no_face_with_enforcement_is_detection_error() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(vec![], vec![("Man", 60.0)]));
        let request = AnalysisRequest {
            enforce_detection: true,
            ..AnalysisRequest::default()
        };

        let err = analyzer.analyze(&frame(), &request).unwrap_err();
        assert!(matches!(err, AnalyzerError::Detection(_)));
        assert!(!err.is_download_related());
    }

    #[test]
    fn test_dominant_gender_is_first_highest() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(
            vec![FaceRegion::new(0, 0, 10, 10)],
            vec![("Man", 50.0), ("Woman", 50.0)],
        ));

        let results = analyzer
            .analyze(&frame(), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results[0].dominant_gender, "Man");
        assert!(matches!(results[0].gender, GenderField::Distribution(_)));
    }

    #[test]
    fn test_regions_are_clamped_and_offscreen_faces_dropped() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(
            vec![FaceRegion::new(90, 70, 20, 20), FaceRegion::new(500, 500, 10, 10)],
            vec![("Woman", 90.0), ("Man", 10.0)],
        ));

        let results = analyzer
            .analyze(&frame(), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].region, FaceRegion::new(90, 70, 10, 10));
    }

    #[test]
    fn test_unrequested_gender_is_unavailable() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(
            vec![FaceRegion::new(0, 0, 10, 10)],
            vec![("Man", 60.0)],
        ));
        let request = AnalysisRequest {
            attributes: vec![Attribute::Emotion],
            ..AnalysisRequest::default()
        };

        let results = analyzer.analyze(&frame(), &request).unwrap().into_results();
        assert_eq!(results[0].gender, GenderField::Unavailable);
        assert_eq!(results[0].emotion.get("happy"), Some(80.0));
    }

    #[test]
    fn test_non_rgb_frame_is_invalid_input() {
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(loader_with(vec![], vec![]));
        let gray = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        let err = analyzer
            .analyze(&gray, &AnalysisRequest::default())
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput(_)));
    }

    #[test]
    fn test_warm_up_loads_models_before_first_analysis() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let mut inner = loader_with(vec![FaceRegion::new(0, 0, 10, 10)], vec![("Man", 60.0)]);
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            inner()
        }));

        analyzer.warm_up().unwrap();
        assert!(analyzer.is_loaded());
        analyzer.analyze(&frame(), &AnalysisRequest::default()).unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_warm_up_falls_back_to_lazy_load() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let mut inner = loader_with(vec![FaceRegion::new(0, 0, 10, 10)], vec![("Man", 60.0)]);
        let mut analyzer = OnnxAttributeAnalyzer::with_loader(Box::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(AnalyzerError::ModelDownload {
                    hint: ModelHint::in_user_cache("emotion.onnx", "https://example.com/e.onnx"),
                    message: "offline".to_string(),
                });
            }
            inner()
        }));

        assert!(analyzer.warm_up().is_err());
        assert!(!analyzer.is_loaded());

        let results = analyzer
            .analyze(&frame(), &AnalysisRequest::default())
            .unwrap()
            .into_results();

        assert_eq!(results.len(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
