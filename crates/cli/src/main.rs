use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use emotion_lens_core::analysis::domain::attribute_analyzer::FaceAttributeAnalyzer;
use emotion_lens_core::analysis::infrastructure::onnx_attribute_analyzer::OnnxAttributeAnalyzer;
use emotion_lens_core::analysis::infrastructure::replay_analyzer::ReplayAnalyzer;
use emotion_lens_core::annotation::infrastructure::imageproc_overlay_renderer::ImageprocOverlayRenderer;
use emotion_lens_core::capture::domain::camera::Camera;
use emotion_lens_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use emotion_lens_core::capture::infrastructure::image_file_camera::ImageFileCamera;
use emotion_lens_core::display::domain::display::Display;
use emotion_lens_core::display::domain::quit_signal::QuitSignal;
use emotion_lens_core::display::infrastructure::headless_display::HeadlessDisplay;
use emotion_lens_core::display::infrastructure::snapshot_display::SnapshotDisplay;
use emotion_lens_core::display::infrastructure::video_file_display::VideoFileDisplay;
use emotion_lens_core::pipeline::annotation_loop::{
    AnnotationLoop, AnnotatorConfig, LoopOutcome, StopReason,
};
use emotion_lens_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use emotion_lens_core::shared::constants::{DOWNLOAD_FAILURE_THRESHOLD, SAMPLING_PERIOD};
use emotion_lens_core::shared::frame::Frame;

const EXIT_TRIPPED: i32 = 2;
const PROGRESS_EVERY: u64 = 100;

/// Real-time emotion and gender overlays for camera or video input.
#[derive(Parser)]
#[command(name = "emotion-lens")]
struct Cli {
    /// Video file, stream URL, still image, or capture device (with --input-format).
    input: String,

    /// Capture device input format, e.g. v4l2, avfoundation or dshow.
    #[arg(long)]
    input_format: Option<String>,

    /// Write annotated frames to this video file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write annotated frames as PNG snapshots into this directory.
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Keep every Nth annotated frame when writing snapshots.
    #[arg(long, default_value = "1")]
    snapshot_every: u64,

    /// Replay recorded analyzer results from a JSON file instead of running models.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Analyze every Nth frame.
    #[arg(long, default_value_t = SAMPLING_PERIOD)]
    sample_every: u64,

    /// Model download failures tolerated before giving up.
    #[arg(long, default_value_t = DOWNLOAD_FAILURE_THRESHOLD)]
    max_download_failures: u32,

    /// Clear the download failure count after a successful analysis.
    #[arg(long)]
    reset_failures_on_success: bool,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// TrueType font for overlay text. Without it only boxes and bars are drawn.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Directory with bundled ONNX models, checked before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(outcome) => {
            log::info!(
                "Stopped after {} frames ({} analyses): {}",
                outcome.frames,
                outcome.analyses,
                describe(&outcome.reason)
            );
            // The loop has already logged the remediation.
            let code = exit_code(&outcome.reason);
            if code != 0 {
                process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<LoopOutcome, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let analyzer = build_analyzer(&cli)?;

    let quit = QuitSignal::new();
    watch_stdin(quit.clone());

    let camera = open_camera(&cli)?;
    let display = open_display(&cli, camera.info().fps, quit)?;
    let renderer = match &cli.font {
        Some(path) => ImageprocOverlayRenderer::with_font_file(path)?,
        None => ImageprocOverlayRenderer::new(),
    };

    let config = AnnotatorConfig {
        sampling_period: cli.sample_every,
        failure_threshold: cli.max_download_failures,
        reset_failures_on_success: cli.reset_failures_on_success,
        ..AnnotatorConfig::default()
    };

    log::info!("Annotating {} (type q + Enter to stop)", cli.input);
    let mut annotation_loop =
        AnnotationLoop::new(camera, analyzer, Box::new(renderer), display, config)?
            .with_logger(Box::new(StdoutPipelineLogger::new(PROGRESS_EVERY)));
    Ok(annotation_loop.run()?)
}

fn open_camera(cli: &Cli) -> Result<Box<dyn Camera>, Box<dyn std::error::Error>> {
    if let Some(format) = &cli.input_format {
        return Ok(Box::new(FfmpegCamera::open_device(&cli.input, format)?));
    }
    let path = Path::new(&cli.input);
    if ImageFileCamera::is_image_path(path) {
        let repeat = cli.max_frames.unwrap_or(cli.sample_every);
        return Ok(Box::new(ImageFileCamera::open(path, repeat)?));
    }
    Ok(Box::new(FfmpegCamera::open(&cli.input)?))
}

fn open_display(
    cli: &Cli,
    fps: f64,
    quit: QuitSignal,
) -> Result<Box<dyn Display>, Box<dyn std::error::Error>> {
    let inner: Box<dyn Display> = if let Some(path) = &cli.output {
        Box::new(VideoFileDisplay::new(path, fps, quit.clone()))
    } else if let Some(dir) = &cli.snapshots {
        Box::new(SnapshotDisplay::new(dir, cli.snapshot_every, quit.clone())?)
    } else {
        Box::new(HeadlessDisplay::new(quit.clone()))
    };

    Ok(match cli.max_frames {
        Some(limit) => Box::new(FrameLimit::new(inner, limit, quit)),
        None => inner,
    })
}

fn build_analyzer(
    cli: &Cli,
) -> Result<Box<dyn FaceAttributeAnalyzer>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.replay {
        let analyzer = ReplayAnalyzer::from_file(path)?;
        log::info!("Replaying {} recorded analyses from {}", analyzer.len(), path.display());
        return Ok(Box::new(analyzer));
    }
    let mut analyzer = OnnxAttributeAnalyzer::new(cli.models_dir.clone(), cli.confidence);
    preload(&mut analyzer);
    Ok(Box::new(analyzer))
}

/// Fetches and loads models before capture starts. Failure is not fatal:
/// the analyzer retries on the first sampled frame.
fn preload(analyzer: &mut OnnxAttributeAnalyzer) -> bool {
    log::info!("Loading models (the first run may take a while)");
    match analyzer.warm_up() {
        Ok(()) => {
            log::info!("Models ready");
            true
        }
        Err(e) => {
            log::warn!("Model preload failed, models will be loaded on the first frame: {e}");
            false
        }
    }
}

/// Requests a quit once `limit` frames have been shown.
struct FrameLimit {
    inner: Box<dyn Display>,
    limit: u64,
    shown: u64,
    quit: QuitSignal,
}

impl FrameLimit {
    fn new(inner: Box<dyn Display>, limit: u64, quit: QuitSignal) -> Self {
        Self {
            inner,
            limit,
            shown: 0,
            quit,
        }
    }
}

impl Display for FrameLimit {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.inner.show(frame)?;
        self.shown += 1;
        if self.shown >= self.limit {
            self.quit.request();
        }
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.inner.poll_quit()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Sets the quit signal when the user types `q` on stdin.
fn watch_stdin(quit: QuitSignal) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(l) if l.trim().eq_ignore_ascii_case("q") => {
                    quit.request();
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

fn exit_code(reason: &StopReason) -> i32 {
    match reason {
        StopReason::GuardTripped(_) => EXIT_TRIPPED,
        StopReason::CameraExhausted | StopReason::UserQuit => 0,
    }
}

fn describe(reason: &StopReason) -> &'static str {
    match reason {
        StopReason::CameraExhausted => "end of input",
        StopReason::GuardTripped(_) => "model download failures",
        StopReason::UserQuit => "quit requested",
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let is_url = cli.input.contains("://");
    if cli.input_format.is_none() && !is_url && !Path::new(&cli.input).exists() {
        return Err(format!("Input not found: {}", cli.input).into());
    }
    if cli.output.is_some() && cli.snapshots.is_some() {
        return Err("--output and --snapshots are mutually exclusive".into());
    }
    if cli.sample_every == 0 {
        return Err("--sample-every must be at least 1".into());
    }
    if cli.max_download_failures == 0 {
        return Err("--max-download-failures must be at least 1".into());
    }
    if cli.snapshot_every == 0 {
        return Err("--snapshot-every must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(path) = &cli.replay {
        if !path.is_file() {
            return Err(format!("Replay file not found: {}", path.display()).into());
        }
    }
    if let Some(path) = &cli.font {
        if !path.is_file() {
            return Err(format!("Font file not found: {}", path.display()).into());
        }
    }
    if let Some(dir) = &cli.models_dir {
        if !dir.is_dir() {
            return Err(format!("Models directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}
