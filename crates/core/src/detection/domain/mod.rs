pub mod face_analyzer;
pub mod pattern_detector;
