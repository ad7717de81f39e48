use std::panic::{self, AssertUnwindSafe};

use crate::detection::domain::pattern_detector::{
    DetectionError, DetectionProfile, FeatureKind, PatternDetector,
};
use crate::shared::frame::GrayFrame;
use crate::shared::rect::Rect;

/// One detected face with the eyes and smiles found inside it.
///
/// `face` is in frame coordinates; `eyes` and `smiles` are relative to the
/// face's top-left corner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceDetection {
    pub face: Rect,
    pub eyes: Vec<Rect>,
    pub smiles: Vec<Rect>,
}

/// Everything detected in a single frame, faces in detector order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameAnalysis {
    pub faces: Vec<FaceDetection>,
}

impl FrameAnalysis {
    pub fn eye_count(&self) -> usize {
        self.faces.iter().map(|f| f.eyes.len()).sum()
    }

    pub fn smile_count(&self) -> usize {
        self.faces.iter().map(|f| f.smiles.len()).sum()
    }
}

/// Runs the face -> (eyes, smiles) search for one worker.
///
/// Owns that worker's three detectors. Any failing detector call (error,
/// panic or out-of-bounds result) contributes nothing for that region and
/// is counted instead of aborting the frame.
pub struct FaceAnalyzer {
    face: Box<dyn PatternDetector>,
    eye: Box<dyn PatternDetector>,
    smile: Box<dyn PatternDetector>,
    profile: DetectionProfile,
    pending_failures: usize,
}

impl FaceAnalyzer {
    pub fn new(
        face: Box<dyn PatternDetector>,
        eye: Box<dyn PatternDetector>,
        smile: Box<dyn PatternDetector>,
        profile: DetectionProfile,
    ) -> Self {
        Self {
            face,
            eye,
            smile,
            profile,
            pending_failures: 0,
        }
    }

    pub fn analyze(&mut self, gray: &GrayFrame) -> FrameAnalysis {
        let faces = self.detect_checked(FeatureKind::Face, gray);

        let mut analysis = FrameAnalysis {
            faces: Vec::with_capacity(faces.len()),
        };
        for face in faces {
            // Validated against the frame above, so the crop always succeeds.
            let (eyes, smiles) = match gray.crop(&face) {
                Some(region) => (
                    self.detect_checked(FeatureKind::Eye, &region),
                    self.detect_checked(FeatureKind::Smile, &region),
                ),
                None => (Vec::new(), Vec::new()),
            };
            analysis.faces.push(FaceDetection { face, eyes, smiles });
        }
        analysis
    }

    /// Failures recorded since the last call, resetting the count.
    pub fn take_failure_count(&mut self) -> usize {
        std::mem::take(&mut self.pending_failures)
    }

    fn detect_checked(&mut self, kind: FeatureKind, image: &GrayFrame) -> Vec<Rect> {
        let params = *self.profile.params(kind);
        let detector = match kind {
            FeatureKind::Face => &mut self.face,
            FeatureKind::Eye => &mut self.eye,
            FeatureKind::Smile => &mut self.smile,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(image, &params)))
            .unwrap_or(Err(DetectionError::Panicked))
            .and_then(|rects| validate(rects, image));

        match result {
            Ok(rects) => rects,
            Err(e) => {
                log::warn!(
                    "{kind} detection on {}x{} image dropped: {e}",
                    image.width(),
                    image.height()
                );
                self.pending_failures += 1;
                Vec::new()
            }
        }
    }
}

fn validate(rects: Vec<Rect>, image: &GrayFrame) -> Result<Vec<Rect>, DetectionError> {
    match rects
        .iter()
        .find(|r| !r.fits_within(image.width(), image.height()))
    {
        Some(bad) => Err(DetectionError::Malformed(*bad)),
        None => Ok(rects),
    }
}
