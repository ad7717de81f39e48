use crate::detection::domain::face_analyzer::FrameAnalysis;
use crate::shared::frame::{Frame, GrayFrame};

/// One captured frame on its way from the capture loop to a worker.
#[derive(Debug)]
pub struct FrameJob {
    pub color: Frame,
    /// Equalized grayscale copy the detectors search.
    pub gray: GrayFrame,
    /// Capture order, starting at 0 with no gaps.
    pub sequence: u64,
}

/// A worker's finished frame, handed to the display stage.
#[derive(Debug)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub sequence: u64,
    pub analysis: FrameAnalysis,
    pub boxes_drawn: usize,
    pub detect_ms: f64,
    pub annotate_ms: f64,
    pub detection_failures: usize,
    /// Work queue length when the worker picked this job up.
    pub queue_depth: usize,
    pub worker: usize,
}
