use crate::imaging::preprocessor::to_equalized_gray;
use crate::pipeline::frame_job::FrameJob;
use crate::pipeline::pipeline_executor::{Backpressure, CaptureEnd};
use crate::pipeline::work_queue::{EnqueueError, WorkQueue};
use crate::video::domain::video_source::VideoSource;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub frames_captured: usize,
    pub end: CaptureEnd,
}

/// Shuts the queue down when dropped, so consumers are released even if
/// the capture loop unwinds.
struct ShutdownOnDrop<'a>(&'a WorkQueue<FrameJob>);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Producer side of the pipeline: read, preprocess, enqueue until the source
/// runs dry or a stop is requested. Always shuts the queue down on exit.
pub fn run_capture(
    source: &mut dyn VideoSource,
    queue: &WorkQueue<FrameJob>,
    backpressure: Backpressure,
) -> CaptureSummary {
    let _guard = ShutdownOnDrop(queue);
    let mut summary = CaptureSummary::default();
    let mut sequence: u64 = 0;

    summary.end = loop {
        if queue.signal().is_stop_requested() {
            break CaptureEnd::Stopped;
        }

        let frame = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => break CaptureEnd::Exhausted,
            Err(e) => {
                log::warn!("Video read failed after {sequence} frames: {e}");
                break CaptureEnd::ReadFailed;
            }
        };

        let gray = match to_equalized_gray(&frame) {
            Ok(gray) => gray,
            Err(e) => {
                log::warn!("Skipping frame {}: {e}", frame.index());
                continue;
            }
        };

        let job = FrameJob {
            color: frame,
            gray,
            sequence,
        };
        if submit(queue, job, backpressure).is_err() {
            break CaptureEnd::Stopped;
        }
        log::debug!("Queued frame {sequence} (depth {})", queue.len());
        sequence += 1;
        summary.frames_captured += 1;
    };

    log::debug!(
        "Capture finished: {:?} after {} frames",
        summary.end,
        summary.frames_captured
    );
    summary
}

fn submit(
    queue: &WorkQueue<FrameJob>,
    job: FrameJob,
    backpressure: Backpressure,
) -> Result<(), FrameJob> {
    match backpressure {
        Backpressure::Block => queue.enqueue(job).map_err(EnqueueError::into_inner),
        Backpressure::Poll { pause } => {
            let mut job = job;
            loop {
                match queue.try_enqueue(job) {
                    Ok(()) => return Ok(()),
                    Err(EnqueueError::Full(back)) => {
                        job = back;
                        std::thread::sleep(pause);
                    }
                    Err(EnqueueError::Closed(back)) => return Err(back),
                }
            }
        }
    }
}
