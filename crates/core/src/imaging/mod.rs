pub mod annotator;
pub mod preprocessor;
