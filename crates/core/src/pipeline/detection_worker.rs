use std::time::Instant;

use crossbeam_channel::Sender;

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::imaging::annotator::{annotate, AnnotationStyle};
use crate::pipeline::frame_job::{AnnotatedFrame, FrameJob};
use crate::pipeline::work_queue::WorkQueue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub frames_processed: usize,
    pub detection_failures: usize,
}

/// Consumer loop for one worker: dequeue, detect, annotate, publish.
///
/// Ends when the queue reports no more work, a stop is requested, or the
/// display stage has gone away.
pub fn run_worker(
    worker: usize,
    analyzer: &mut FaceAnalyzer,
    queue: &WorkQueue<FrameJob>,
    display_tx: &Sender<AnnotatedFrame>,
    style: &AnnotationStyle,
) -> WorkerSummary {
    let mut summary = WorkerSummary::default();

    while let Some(job) = queue.dequeue() {
        let queue_depth = queue.len();
        let FrameJob {
            color: mut frame,
            gray,
            sequence,
        } = job;

        let t0 = Instant::now();
        let analysis = analyzer.analyze(&gray);
        let detect_ms = t0.elapsed().as_secs_f64() * 1000.0;
        let detection_failures = analyzer.take_failure_count();

        let t1 = Instant::now();
        let boxes_drawn = annotate(&mut frame, &analysis, style);
        let annotate_ms = t1.elapsed().as_secs_f64() * 1000.0;

        log::debug!(
            "Worker {worker}: frame {sequence} -> {} faces, {boxes_drawn} boxes in {detect_ms:.1}ms",
            analysis.faces.len()
        );

        summary.frames_processed += 1;
        summary.detection_failures += detection_failures;

        let annotated = AnnotatedFrame {
            frame,
            sequence,
            analysis,
            boxes_drawn,
            detect_ms,
            annotate_ms,
            detection_failures,
            queue_depth,
            worker,
        };
        if display_tx.send(annotated).is_err() {
            log::debug!("Worker {worker}: display stage closed");
            break;
        }
        if queue.signal().is_stop_requested() {
            break;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::pattern_detector::{
        DetectionError, DetectionParams, DetectionProfile, PatternDetector,
    };
    use crate::shared::frame::{Frame, GrayFrame};
    use crate::shared::rect::Rect;

    struct Fixed(Vec<Rect>);

    impl PatternDetector for Fixed {
        fn detect(&mut self, _: &GrayFrame, _: &DetectionParams) -> Result<Vec<Rect>, DetectionError> {
            Ok(self.0.clone())
        }
    }

    fn analyzer(faces: Vec<Rect>) -> FaceAnalyzer {
        FaceAnalyzer::new(
            Box::new(Fixed(faces)),
            Box::new(Fixed(vec![Rect::new(1, 1, 4, 4)])),
            Box::new(Fixed(vec![])),
            DetectionProfile::default(),
        )
    }

    fn job(sequence: u64) -> FrameJob {
        FrameJob {
            color: Frame::new(vec![0; 32 * 32 * 3], 32, 32, sequence as usize),
            gray: GrayFrame::new(vec![0; 32 * 32], 32, 32),
            sequence,
        }
    }

    #[test]
    fn test_processes_until_queue_drained() {
        let queue = WorkQueue::new(8).unwrap();
        for i in 0..5 {
            queue.enqueue(job(i)).unwrap();
        }
        queue.shutdown();
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut analyzer = analyzer(vec![Rect::new(2, 2, 20, 20)]);
        let summary = run_worker(0, &mut analyzer, &queue, &tx, &AnnotationStyle::default());
        drop(tx);

        assert_eq!(summary.frames_processed, 5);
        let out: Vec<AnnotatedFrame> = rx.iter().collect();
        assert_eq!(out.iter().map(|f| f.sequence).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(out.iter().all(|f| f.boxes_drawn == 2 && f.analysis.eye_count() == 1));
    }

    #[test]
    fn test_stops_when_display_gone() {
        let queue = WorkQueue::new(8).unwrap();
        for i in 0..3 {
            queue.enqueue(job(i)).unwrap();
        }
        queue.shutdown();
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);

        let mut analyzer = analyzer(vec![]);
        let summary = run_worker(1, &mut analyzer, &queue, &tx, &AnnotationStyle::default());
        assert_eq!(summary.frames_processed, 1);
    }

    #[test]
    fn test_failures_are_counted_per_frame() {
        let queue = WorkQueue::new(2).unwrap();
        queue.enqueue(job(0)).unwrap();
        queue.shutdown();
        let (tx, rx) = crossbeam_channel::unbounded();

        // Face extends past the 32x32 frame, so the face result is rejected.
        let mut analyzer = analyzer(vec![Rect::new(20, 20, 20, 20)]);
        let summary = run_worker(0, &mut analyzer, &queue, &tx, &AnnotationStyle::default());

        assert_eq!(summary.detection_failures, 1);
        let annotated = rx.try_recv().unwrap();
        assert_eq!(annotated.detection_failures, 1);
        assert_eq!(annotated.boxes_drawn, 0);
    }
}
