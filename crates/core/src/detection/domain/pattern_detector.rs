use std::fmt;

use thiserror::Error;

use crate::shared::frame::GrayFrame;
use crate::shared::rect::Rect;

/// The three feature kinds a worker searches for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Face,
    Eye,
    Smile,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 3] = [FeatureKind::Face, FeatureKind::Eye, FeatureKind::Smile];
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::Face => "face",
            FeatureKind::Eye => "eye",
            FeatureKind::Smile => "smile",
        };
        f.write_str(name)
    }
}

/// Search parameters passed to a detector on every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Smallest square (in pixels) worth reporting.
    pub min_size: u32,
    /// Ratio between successive search scales; must be > 1.
    pub scale_step: f64,
    /// How many overlapping candidates must agree before a hit is kept.
    /// Higher is stricter.
    pub min_neighbors: u32,
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.scale_step.is_finite() && self.scale_step > 1.0) {
            return Err(format!("scale step must be > 1.0, got {}", self.scale_step));
        }
        Ok(())
    }
}

/// Parameters for all three feature kinds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionProfile {
    pub face: DetectionParams,
    pub eye: DetectionParams,
    pub smile: DetectionParams,
}

impl DetectionProfile {
    pub fn params(&self, kind: FeatureKind) -> &DetectionParams {
        match kind {
            FeatureKind::Face => &self.face,
            FeatureKind::Eye => &self.eye,
            FeatureKind::Smile => &self.smile,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for kind in FeatureKind::ALL {
            self.params(kind)
                .validate()
                .map_err(|e| format!("{kind} detection: {e}"))?;
        }
        Ok(())
    }
}

impl Default for DetectionProfile {
    fn default() -> Self {
        Self {
            face: DetectionParams {
                min_size: 150,
                scale_step: 1.1,
                min_neighbors: 4,
            },
            eye: DetectionParams {
                min_size: 60,
                scale_step: 1.27,
                min_neighbors: 5,
            },
            smile: DetectionParams {
                min_size: 35,
                scale_step: 1.27,
                min_neighbors: 20,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector backend failed: {0}")]
    Backend(String),
    #[error("detector panicked")]
    Panicked,
    #[error("detector returned malformed rectangle {0:?}")]
    Malformed(Rect),
}

/// A pre-trained pattern matcher (one per feature kind per worker).
///
/// Rectangles are relative to `image`. Implementations keep internal
/// scratch state, hence `&mut self`; each worker owns its own instances.
pub trait PatternDetector: Send {
    fn detect(
        &mut self,
        image: &GrayFrame,
        params: &DetectionParams,
    ) -> Result<Vec<Rect>, DetectionError>;
}
