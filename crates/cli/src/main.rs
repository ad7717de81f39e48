use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use facewatch_core::detection::domain::face_analyzer::FaceAnalyzer;
use facewatch_core::detection::domain::pattern_detector::{
    DetectionParams, DetectionProfile, FeatureKind, PatternDetector,
};
use facewatch_core::detection::infrastructure::haar_cascade_detector::HaarCascadeDetector;
use facewatch_core::detection::infrastructure::model_resolver::{self, CascadeLocations};
use facewatch_core::display::domain::display_sink::DisplaySink;
use facewatch_core::display::infrastructure::ffmpeg_recording_sink::FfmpegRecordingSink;
use facewatch_core::display::infrastructure::frame_limit_sink::FrameLimitSink;
use facewatch_core::display::infrastructure::highgui_window_sink::HighguiWindowSink;
use facewatch_core::display::infrastructure::image_sequence_sink::ImageSequenceSink;
use facewatch_core::pipeline::error::PipelineError;
use facewatch_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use facewatch_core::pipeline::pipeline_executor::{Backpressure, PipelineConfig, PipelineExecutor};
use facewatch_core::pipeline::pipeline_logger::{PipelineLogger, SummaryPipelineLogger};
use facewatch_core::shared::constants::{
    DEFAULT_DISPLAY_POLL_MS, DISPLAY_WINDOW_TITLE, EYE_CASCADE_NAME, FACE_CASCADE_NAME,
    SMILE_CASCADE_NAME,
};
use facewatch_core::shared::video_metadata::VideoMetadata;
use facewatch_core::video::domain::video_source::VideoSource;
use facewatch_core::video::infrastructure::ffmpeg_source::FfmpegVideoSource;

/// Detect faces, eyes and smiles in a video and show the annotated result.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Directory containing the stock OpenCV cascade XML files.
    #[arg(long)]
    cascade_dir: Option<PathBuf>,

    /// Face cascade file (overrides --cascade-dir).
    #[arg(long)]
    face_cascade: Option<PathBuf>,

    /// Eye cascade file (overrides --cascade-dir).
    #[arg(long)]
    eye_cascade: Option<PathBuf>,

    /// Smile cascade file (overrides --cascade-dir).
    #[arg(long)]
    smile_cascade: Option<PathBuf>,

    /// Never download missing cascades.
    #[arg(long)]
    no_download: bool,

    /// Number of detection worker threads.
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Maximum number of frames waiting for a worker.
    #[arg(long, default_value = "30")]
    queue_capacity: usize,

    /// What capture does when the queue is full: block or poll.
    #[arg(long, default_value = "block")]
    backpressure: String,

    /// Show frames in capture order instead of completion order.
    #[arg(long)]
    ordered: bool,

    /// Record the annotated video to this file instead of opening a window.
    #[arg(long, conflicts_with = "frames_dir")]
    record: Option<PathBuf>,

    /// Write annotated frames as PNG files into this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Stop after showing this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Smallest face size in pixels.
    #[arg(long, default_value = "150")]
    face_min_size: u32,

    /// Smallest eye size in pixels (inside a face).
    #[arg(long, default_value = "60")]
    eye_min_size: u32,

    /// Smallest smile size in pixels (inside a face).
    #[arg(long, default_value = "35")]
    smile_min_size: u32,

    /// Neighbors required to keep a face (higher is stricter).
    #[arg(long, default_value = "4")]
    face_neighbors: u32,

    /// Neighbors required to keep an eye.
    #[arg(long, default_value = "5")]
    eye_neighbors: u32,

    /// Neighbors required to keep a smile.
    #[arg(long, default_value = "20")]
    smile_neighbors: u32,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    validate(&cli).map_err(PipelineError::InvalidConfig)?;
    let profile = detection_profile(&cli);
    profile.validate().map_err(PipelineError::InvalidConfig)?;

    let mut source = FfmpegVideoSource::new();
    let metadata = source
        .open(&cli.input)
        .map_err(|e| PipelineError::SourceOpen {
            path: cli.input.clone(),
            reason: e.to_string(),
        })?;
    log::info!(
        "Opened {} ({}x{}, {:.2} fps, {} frames)",
        cli.input.display(),
        metadata.width,
        metadata.height,
        source.native_frame_rate(),
        metadata.total_frames
    );

    let config = pipeline_config(&cli, &metadata);
    let analyzers = build_analyzers(&cli, config.workers, profile)?;
    let mut sink = build_sink(&cli, &metadata).map_err(|e| PipelineError::Display(e.to_string()))?;

    let mut logger = SummaryPipelineLogger::default();
    let report = ThreadedPipelineExecutor::new().execute(
        Box::new(source),
        analyzers,
        sink.as_mut(),
        &metadata,
        &config,
        &mut logger,
    )?;
    logger.summary();

    if report.user_stopped {
        log::info!("Stopped by user after {} frames", report.frames_shown);
    }
    if let Some(path) = &cli.record {
        log::info!("Output written to {}", path.display());
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), String> {
    if cli.workers == 0 {
        return Err("--workers must be at least 1".into());
    }
    if cli.queue_capacity == 0 {
        return Err("--queue-capacity must be at least 1".into());
    }
    if cli.backpressure != "block" && cli.backpressure != "poll" {
        return Err(format!(
            "Backpressure must be 'block' or 'poll', got '{}'",
            cli.backpressure
        ));
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn detection_profile(cli: &Cli) -> DetectionProfile {
    let defaults = DetectionProfile::default();
    DetectionProfile {
        face: DetectionParams {
            min_size: cli.face_min_size,
            min_neighbors: cli.face_neighbors,
            ..defaults.face
        },
        eye: DetectionParams {
            min_size: cli.eye_min_size,
            min_neighbors: cli.eye_neighbors,
            ..defaults.eye
        },
        smile: DetectionParams {
            min_size: cli.smile_min_size,
            min_neighbors: cli.smile_neighbors,
            ..defaults.smile
        },
    }
}

fn pipeline_config(cli: &Cli, metadata: &VideoMetadata) -> PipelineConfig {
    let backpressure = if cli.backpressure == "poll" {
        Backpressure::Poll {
            pause: metadata.frame_interval(),
        }
    } else {
        Backpressure::Block
    };

    PipelineConfig {
        workers: cli.workers,
        queue_capacity: cli.queue_capacity,
        backpressure,
        ordered_display: cli.ordered,
        display_poll: Duration::from_millis(DEFAULT_DISPLAY_POLL_MS),
        ..PipelineConfig::default()
    }
}

/// Resolves the three cascades once, then loads a private detector set for
/// every worker.
fn build_analyzers(
    cli: &Cli,
    workers: usize,
    profile: DetectionProfile,
) -> Result<Vec<FaceAnalyzer>, PipelineError> {
    let locations = CascadeLocations {
        cascade_dir: cli.cascade_dir.clone(),
        cache_dir: None,
        allow_download: !cli.no_download,
    };

    let face_path = resolve(FeatureKind::Face, cli.face_cascade.as_deref(), &locations)?;
    let eye_path = resolve(FeatureKind::Eye, cli.eye_cascade.as_deref(), &locations)?;
    let smile_path = resolve(FeatureKind::Smile, cli.smile_cascade.as_deref(), &locations)?;

    (0..workers)
        .map(|_| -> Result<FaceAnalyzer, PipelineError> {
            Ok(FaceAnalyzer::new(
                load(FeatureKind::Face, &face_path)?,
                load(FeatureKind::Eye, &eye_path)?,
                load(FeatureKind::Smile, &smile_path)?,
                profile,
            ))
        })
        .collect()
}

fn resolve(
    kind: FeatureKind,
    explicit: Option<&Path>,
    locations: &CascadeLocations,
) -> Result<PathBuf, PipelineError> {
    let name = match kind {
        FeatureKind::Face => FACE_CASCADE_NAME,
        FeatureKind::Eye => EYE_CASCADE_NAME,
        FeatureKind::Smile => SMILE_CASCADE_NAME,
    };
    log::info!("Resolving {kind} cascade: {name}");
    model_resolver::resolve_cascade(name, explicit, locations).map_err(|e| {
        PipelineError::ModelLoad {
            kind,
            path: explicit.map_or_else(|| PathBuf::from(name), Path::to_path_buf),
            reason: e.to_string(),
        }
    })
}

fn load(kind: FeatureKind, path: &Path) -> Result<Box<dyn PatternDetector>, PipelineError> {
    let detector = HaarCascadeDetector::load(path).map_err(|e| PipelineError::ModelLoad {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Box::new(detector))
}

fn build_sink(
    cli: &Cli,
    metadata: &VideoMetadata,
) -> Result<Box<dyn DisplaySink>, Box<dyn std::error::Error>> {
    let sink: Box<dyn DisplaySink> = if let Some(path) = &cli.record {
        Box::new(FfmpegRecordingSink::create(path, metadata)?)
    } else if let Some(dir) = &cli.frames_dir {
        Box::new(ImageSequenceSink::create(dir)?)
    } else {
        Box::new(HighguiWindowSink::new(DISPLAY_WINDOW_TITLE))
    };

    match cli.max_frames {
        Some(limit) => Ok(Box::new(FrameLimitSink::new(sink, limit)?)),
        None => Ok(sink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("facewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_match_library_defaults() {
        let cli = parse(&["clip.mp4"]);
        assert_eq!(detection_profile(&cli), DetectionProfile::default());
        assert_eq!(cli.workers, 2);
        assert_eq!(cli.queue_capacity, 30);
        assert!(validate(&cli).is_ok());
    }

    #[rstest]
    #[case::zero_workers(&["clip.mp4", "--workers", "0"])]
    #[case::zero_capacity(&["clip.mp4", "--queue-capacity", "0"])]
    #[case::bad_backpressure(&["clip.mp4", "--backpressure", "drop"])]
    #[case::zero_max_frames(&["clip.mp4", "--max-frames", "0"])]
    fn test_validate_rejects(#[case] args: &[&str]) {
        assert!(validate(&parse(args)).is_err());
    }

    #[test]
    fn test_record_and_frames_dir_conflict() {
        let result = Cli::try_parse_from([
            "facewatch",
            "clip.mp4",
            "--record",
            "out.mp4",
            "--frames-dir",
            "frames",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_poll_pause_follows_frame_rate() {
        let cli = parse(&["clip.mp4", "--backpressure", "poll"]);
        let metadata = VideoMetadata {
            width: 640,
            height: 480,
            fps: 25.0,
            total_frames: 0,
            codec: String::new(),
            source_path: None,
        };
        let config = pipeline_config(&cli, &metadata);
        assert_eq!(
            config.backpressure,
            Backpressure::Poll {
                pause: Duration::from_millis(40)
            }
        );
    }

    #[test]
    fn test_detection_overrides_keep_scale_step() {
        let cli = parse(&["clip.mp4", "--eye-neighbors", "9", "--smile-min-size", "50"]);
        let profile = detection_profile(&cli);
        assert_eq!(profile.eye.min_neighbors, 9);
        assert_eq!(profile.smile.min_size, 50);
        assert_eq!(profile.eye.scale_step, DetectionProfile::default().eye.scale_step);
    }
}
