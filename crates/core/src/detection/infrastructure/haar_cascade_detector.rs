use std::path::Path;

use opencv::core::{Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detection::domain::pattern_detector::{DetectionError, DetectionParams, PatternDetector};
use crate::shared::frame::GrayFrame;
use crate::shared::rect::Rect;

/// Viola-Jones detector backed by an OpenCV XML cascade.
pub struct HaarCascadeDetector {
    classifier: CascadeClassifier,
    hits: Vector<opencv::core::Rect>,
}

impl HaarCascadeDetector {
    /// Loads a cascade file. Fails if it is missing, unreadable or does not
    /// contain a cascade OpenCV understands.
    pub fn load(path: &Path) -> Result<Self, DetectionError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| DetectionError::Backend(format!("non UTF-8 path {}", path.display())))?;

        let classifier = CascadeClassifier::new(path_str)
            .map_err(|e| DetectionError::Backend(e.to_string()))?;
        if classifier
            .empty()
            .map_err(|e| DetectionError::Backend(e.to_string()))?
        {
            return Err(DetectionError::Backend(format!(
                "{} holds no usable cascade",
                path.display()
            )));
        }

        log::debug!("Loaded cascade {}", path.display());
        Ok(Self {
            classifier,
            hits: Vector::new(),
        })
    }
}

impl PatternDetector for HaarCascadeDetector {
    fn detect(
        &mut self,
        image: &GrayFrame,
        params: &DetectionParams,
    ) -> Result<Vec<Rect>, DetectionError> {
        let backend = |e: opencv::Error| DetectionError::Backend(e.to_string());

        let mat = Mat::new_rows_cols_with_data(image.height() as i32, image.width() as i32, image.data())
            .map_err(backend)?;
        let min = params.min_size as i32;

        self.hits.clear();
        self.classifier
            .detect_multi_scale(
                &*mat,
                &mut self.hits,
                params.scale_step,
                params.min_neighbors as i32,
                0,
                Size::new(min, min),
                Size::new(0, 0),
            )
            .map_err(backend)?;

        Ok(self
            .hits
            .iter()
            .map(|r| Rect::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
