use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::display::domain::display_sink::DisplaySink;
use crate::imaging::annotator::AnnotationStyle;
use crate::pipeline::capture_loop::{run_capture, CaptureSummary};
use crate::pipeline::detection_worker::{run_worker, WorkerSummary};
use crate::pipeline::error::PipelineError;
use crate::pipeline::frame_job::{AnnotatedFrame, FrameJob};
use crate::pipeline::frame_sequencer::FrameSequencer;
use crate::pipeline::pipeline_executor::{
    Backpressure, PipelineConfig, PipelineExecutor, PipelineReport,
};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::work_queue::WorkQueue;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

// Bounded so workers cannot run arbitrarily far ahead of a slow display.
const DEFAULT_DISPLAY_CHANNEL_CAPACITY: usize = 8;

/// Executes the pipeline with one capture thread and one thread per worker.
///
/// Layout: `capture → WorkQueue → worker × N → main [display]`
///
/// The calling thread runs the display stage, so sinks that must live on
/// the main thread (GUI windows) work unchanged.
pub struct ThreadedPipelineExecutor {
    display_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            display_capacity: DEFAULT_DISPLAY_CHANNEL_CAPACITY,
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        source: Box<dyn VideoSource>,
        analyzers: Vec<FaceAnalyzer>,
        sink: &mut dyn DisplaySink,
        metadata: &VideoMetadata,
        config: &PipelineConfig,
        logger: &mut dyn PipelineLogger,
    ) -> Result<PipelineReport, PipelineError> {
        config.validate()?;
        if analyzers.len() != config.workers {
            return Err(PipelineError::InvalidConfig(format!(
                "{} workers configured but {} detector sets supplied",
                config.workers,
                analyzers.len()
            )));
        }

        let queue = Arc::new(WorkQueue::<FrameJob>::new(config.queue_capacity)?);
        let (display_tx, display_rx) =
            crossbeam_channel::bounded::<AnnotatedFrame>(self.display_capacity);

        logger.info(&format!(
            "Starting pipeline: {} workers, queue capacity {}, {:?} backpressure{}",
            config.workers,
            config.queue_capacity,
            config.backpressure,
            if config.ordered_display { ", ordered display" } else { "" }
        ));

        let capture_handle = spawn_capture(source, Arc::clone(&queue), config.backpressure);
        let worker_handles: Vec<_> = analyzers
            .into_iter()
            .enumerate()
            .map(|(id, analyzer)| {
                spawn_worker(id, analyzer, Arc::clone(&queue), display_tx.clone(), config.style)
            })
            .collect();
        // Only workers may hold senders, so the display loop ends with them.
        drop(display_tx);

        let mut stage = DisplayStage {
            sink: &mut *sink,
            queue: &queue,
            logger: &mut *logger,
            poll: config.display_poll,
            total_frames: metadata.total_frames,
            outcome: DisplayOutcome::default(),
        };
        stage.run(
            display_rx,
            config.ordered_display.then_some(config.reorder_window),
        );
        let outcome = stage.outcome;

        // Unblocks capture if every worker exited early.
        queue.signal().request_stop();

        let report = join_threads(capture_handle, worker_handles, sink, outcome)?;
        logger.info(&format!(
            "Pipeline finished: captured {}, processed {}, shown {}, {} detection failures, capture {:?}",
            report.frames_captured,
            report.frames_processed,
            report.frames_shown,
            report.detection_failures,
            report.capture_end
        ));
        Ok(report)
    }
}

fn spawn_capture(
    mut source: Box<dyn VideoSource>,
    queue: Arc<WorkQueue<FrameJob>>,
    backpressure: Backpressure,
) -> JoinHandle<(Box<dyn VideoSource>, CaptureSummary)> {
    std::thread::spawn(move || {
        let summary = run_capture(source.as_mut(), &queue, backpressure);
        (source, summary)
    })
}

fn spawn_worker(
    id: usize,
    mut analyzer: FaceAnalyzer,
    queue: Arc<WorkQueue<FrameJob>>,
    display_tx: Sender<AnnotatedFrame>,
    style: AnnotationStyle,
) -> JoinHandle<WorkerSummary> {
    std::thread::spawn(move || run_worker(id, &mut analyzer, &queue, &display_tx, &style))
}

#[derive(Default)]
struct DisplayOutcome {
    frames_processed: usize,
    frames_shown: usize,
    detection_failures: usize,
    user_stopped: bool,
    error: Option<PipelineError>,
}

/// The display stage, run on the calling thread.
///
/// After a stop (user quit or sink failure) it keeps draining worker output
/// without showing it, so no worker stays blocked on a full channel.
struct DisplayStage<'a> {
    sink: &'a mut dyn DisplaySink,
    queue: &'a WorkQueue<FrameJob>,
    logger: &'a mut dyn PipelineLogger,
    poll: Duration,
    total_frames: usize,
    outcome: DisplayOutcome,
}

impl DisplayStage<'_> {
    /// `reorder_window` is `Some` when frames must be shown in capture order.
    fn run(&mut self, display_rx: Receiver<AnnotatedFrame>, reorder_window: Option<usize>) {
        let mut sequencer = reorder_window.map(FrameSequencer::with_window);
        let mut stopping = false;

        for annotated in display_rx {
            self.record(&annotated);
            if stopping {
                continue;
            }

            let ready = match sequencer.as_mut() {
                Some(seq) => seq.push(annotated.sequence, annotated),
                None => vec![annotated],
            };
            for frame in ready {
                if !self.present(&frame) {
                    stopping = true;
                    break;
                }
            }
        }

        if let Some(seq) = sequencer.as_mut().filter(|_| !stopping) {
            for frame in seq.flush() {
                if !self.present(&frame) {
                    break;
                }
            }
        }
    }

    fn record(&mut self, annotated: &AnnotatedFrame) {
        self.outcome.frames_processed += 1;
        self.outcome.detection_failures += annotated.detection_failures;

        self.logger.timing("detect", annotated.detect_ms);
        self.logger.timing("annotate", annotated.annotate_ms);
        self.logger
            .metric("queue_depth", annotated.queue_depth as f64);
        self.logger
            .metric("faces", annotated.analysis.faces.len() as f64);
        self.logger
            .count("detection_failures", annotated.detection_failures);
        self.logger
            .progress(self.outcome.frames_processed, self.total_frames);
    }

    /// Shows one frame and polls for a quit request. Returns `false` once
    /// the pipeline should stop.
    fn present(&mut self, annotated: &AnnotatedFrame) -> bool {
        let t0 = Instant::now();
        if let Err(e) = self.sink.show(&annotated.frame) {
            log::error!("Display failed on frame {}: {e}", annotated.sequence);
            self.outcome
                .error
                .get_or_insert(PipelineError::Display(e.to_string()));
            self.queue.signal().request_stop();
            return false;
        }
        self.logger
            .timing("display", t0.elapsed().as_secs_f64() * 1000.0);
        self.outcome.frames_shown += 1;

        if self.sink.poll_user_stop(self.poll) {
            log::info!("Stop requested from display after {} frames", self.outcome.frames_shown);
            self.outcome.user_stopped = true;
            self.queue.signal().request_stop();
            return false;
        }
        true
    }
}

/// Joins all pipeline threads, releases the source and the sink, and
/// coalesces the first error encountered.
fn join_threads(
    capture_handle: JoinHandle<(Box<dyn VideoSource>, CaptureSummary)>,
    worker_handles: Vec<JoinHandle<WorkerSummary>>,
    sink: &mut dyn DisplaySink,
    outcome: DisplayOutcome,
) -> Result<PipelineReport, PipelineError> {
    fn set_if_none(slot: &mut Option<PipelineError>, err: PipelineError) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    let mut first_error = outcome.error;
    let mut report = PipelineReport {
        frames_processed: outcome.frames_processed,
        frames_shown: outcome.frames_shown,
        detection_failures: outcome.detection_failures,
        user_stopped: outcome.user_stopped,
        ..PipelineReport::default()
    };

    match capture_handle.join() {
        Ok((mut source, summary)) => {
            source.release();
            report.frames_captured = summary.frames_captured;
            report.capture_end = summary.end;
        }
        Err(_) => set_if_none(&mut first_error, PipelineError::ThreadPanicked("capture".into())),
    }

    for (id, handle) in worker_handles.into_iter().enumerate() {
        match handle.join() {
            Ok(summary) => log::debug!(
                "Worker {id}: {} frames, {} detection failures",
                summary.frames_processed,
                summary.detection_failures
            ),
            Err(_) => set_if_none(
                &mut first_error,
                PipelineError::ThreadPanicked(format!("worker {id}")),
            ),
        }
    }

    if let Err(e) = sink.close_all() {
        set_if_none(&mut first_error, PipelineError::Display(e.to_string()));
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(report),
    }
}
