#[cfg(feature = "opencv")]
pub mod haar_cascade_detector;
pub mod model_resolver;
