use std::time::Instant;

use thiserror::Error;

use crate::analysis::domain::analyzer_error::ModelHint;
use crate::analysis::domain::attribute_analyzer::{AnalysisRequest, FaceAttributeAnalyzer};
use crate::annotation::domain::attribute_aggregator::{annotate, default_exclusions};
use crate::annotation::domain::face_annotation::FaceAnnotation;
use crate::annotation::domain::label_translator::LabelTranslator;
use crate::annotation::domain::overlay_renderer::OverlayRenderer;
use crate::capture::domain::camera::Camera;
use crate::display::domain::display::Display;
use crate::shared::constants::{
    DOWNLOAD_FAILURE_THRESHOLD, EMOTION_MODEL_NAME, EMOTION_MODEL_URL, SAMPLING_PERIOD,
};
use crate::shared::frame::Frame;

use super::failure_guard::{FailureGuard, GuardVerdict, Remediation};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::result_cache::ResultCache;
use super::sampling_scheduler::SamplingScheduler;

/// Tunables for [`AnnotationLoop`].
#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    pub sampling_period: u64,
    pub failure_threshold: u32,
    pub reset_failures_on_success: bool,
    pub excluded_emotions: Vec<String>,
    pub request: AnalysisRequest,
    /// Model named in the remediation when a failure carries no hint of its own.
    pub remediation_hint: ModelHint,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            sampling_period: SAMPLING_PERIOD,
            failure_threshold: DOWNLOAD_FAILURE_THRESHOLD,
            reset_failures_on_success: false,
            excluded_emotions: default_exclusions(),
            request: AnalysisRequest::default(),
            remediation_hint: ModelHint::in_user_cache(EMOTION_MODEL_NAME, EMOTION_MODEL_URL),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StopReason {
    CameraExhausted,
    GuardTripped(Remediation),
    UserQuit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopOutcome {
    pub reason: StopReason,
    /// Frames captured, including one dropped by a trip.
    pub frames: u64,
    /// Analyzer invocations, successful or not.
    pub analyses: u64,
}

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    #[error("annotation loop already ran")]
    AlreadyRun,
    #[error("failed to render frame {frame}: {message}")]
    Render { frame: u64, message: String },
    #[error("failed to display frame {frame}: {message}")]
    Display { frame: u64, message: String },
}

/// Capture and output devices, released together when dropped.
struct Devices {
    camera: Box<dyn Camera>,
    display: Box<dyn Display>,
}

impl Drop for Devices {
    fn drop(&mut self) {
        self.camera.release();
        self.display.close();
    }
}

/// Drives capture, periodic analysis, overlay rendering and display.
///
/// Every `sampling_period`th frame is sent to the analyzer; a success
/// replaces the cached results and every frame is annotated from the cache.
/// Analyzer failures leave the cache untouched and feed the failure guard,
/// which stops the loop once model downloads have failed too often. The
/// camera and display are released exactly once however the loop ends.
pub struct AnnotationLoop {
    devices: Option<Devices>,
    analyzer: Box<dyn FaceAttributeAnalyzer>,
    renderer: Box<dyn OverlayRenderer>,
    logger: Box<dyn PipelineLogger>,
    translator: LabelTranslator,
    scheduler: SamplingScheduler,
    cache: ResultCache,
    guard: FailureGuard,
    excluded: Vec<String>,
    request: AnalysisRequest,
    frame_index: u64,
    analyses: u64,
}

impl AnnotationLoop {
    pub fn new(
        camera: Box<dyn Camera>,
        analyzer: Box<dyn FaceAttributeAnalyzer>,
        renderer: Box<dyn OverlayRenderer>,
        display: Box<dyn Display>,
        config: AnnotatorConfig,
    ) -> Result<Self, LoopError> {
        let scheduler =
            SamplingScheduler::new(config.sampling_period).map_err(LoopError::Config)?;
        let guard = FailureGuard::new(config.failure_threshold, config.remediation_hint)
            .map_err(LoopError::Config)?
            .with_reset_on_success(config.reset_failures_on_success);

        Ok(Self {
            devices: Some(Devices { camera, display }),
            analyzer,
            renderer,
            logger: Box::new(NullPipelineLogger),
            translator: LabelTranslator::new(),
            scheduler,
            cache: ResultCache::new(),
            guard,
            excluded: config.excluded_emotions,
            request: config.request,
            frame_index: 0,
            analyses: 0,
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn guard(&self) -> &FailureGuard {
        &self.guard
    }

    pub fn run(&mut self) -> Result<LoopOutcome, LoopError> {
        let mut devices = self.devices.take().ok_or(LoopError::AlreadyRun)?;

        let reason = loop {
            let Some(mut frame) = devices.camera.read_frame() else {
                break StopReason::CameraExhausted;
            };
            self.frame_index += 1;
            frame.set_index(self.frame_index);
            self.logger.frame(self.frame_index);

            if self.scheduler.is_due(self.frame_index) {
                if let GuardVerdict::Tripped(remediation) = self.analyze(&frame) {
                    log::error!("{remediation}");
                    break StopReason::GuardTripped(remediation);
                }
            }

            self.render(&mut frame)?;

            devices
                .display
                .show(&frame)
                .map_err(|e| LoopError::Display {
                    frame: self.frame_index,
                    message: e.to_string(),
                })?;

            if devices.display.poll_quit() {
                log::info!("Quit requested at frame {}", self.frame_index);
                break StopReason::UserQuit;
            }
        };

        drop(devices);
        self.logger.summary();

        Ok(LoopOutcome {
            reason,
            frames: self.frame_index,
            analyses: self.analyses,
        })
    }

    fn analyze(&mut self, frame: &Frame) -> GuardVerdict {
        let start = Instant::now();
        let outcome = self.analyzer.analyze(frame, &self.request);
        self.logger
            .timing("analyze", start.elapsed().as_secs_f64() * 1000.0);
        self.analyses += 1;

        match outcome {
            Ok(output) => {
                let results = output.into_results();
                log::debug!(
                    "Frame {}: analyzed {} faces",
                    self.frame_index,
                    results.len()
                );
                self.logger.metric("faces", results.len() as f64);
                self.cache.set(results);
                self.guard.record_success();
                GuardVerdict::Continue
            }
            Err(e) => self.guard.record(&e),
        }
    }

    fn render(&mut self, frame: &mut Frame) -> Result<(), LoopError> {
        let Some(results) = self.cache.get() else {
            return Ok(());
        };
        let annotations: Vec<FaceAnnotation> = results
            .iter()
            .map(|r| annotate(r, &self.translator, &self.excluded))
            .collect();

        let start = Instant::now();
        self.renderer
            .render(frame, &annotations)
            .map_err(|e| LoopError::Render {
                frame: self.frame_index,
                message: e.to_string(),
            })?;
        self.logger
            .timing("render", start.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }
}
