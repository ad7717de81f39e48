use std::path::PathBuf;

use thiserror::Error;

use crate::detection::domain::pattern_detector::FeatureKind;

/// Errors that stop the pipeline from starting or finishing cleanly.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open video {path}: {reason}")]
    SourceOpen { path: PathBuf, reason: String },
    #[error("cannot load {kind} cascade {path}: {reason}")]
    ModelLoad {
        kind: FeatureKind,
        path: PathBuf,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("display failed: {0}")]
    Display(String),
    #[error("{0} thread panicked")]
    ThreadPanicked(String),
}

impl PipelineError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::SourceOpen { .. } => 2,
            PipelineError::ModelLoad { .. } => 3,
            PipelineError::InvalidConfig(_)
            | PipelineError::Display(_)
            | PipelineError::ThreadPanicked(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::source(PipelineError::SourceOpen { path: "a.mp4".into(), reason: "missing".into() }, 2)]
    #[case::model(PipelineError::ModelLoad { kind: FeatureKind::Eye, path: "e.xml".into(), reason: "bad".into() }, 3)]
    #[case::config(PipelineError::InvalidConfig("workers".into()), 1)]
    #[case::display(PipelineError::Display("gone".into()), 1)]
    #[case::panic(PipelineError::ThreadPanicked("capture".into()), 1)]
    fn test_exit_codes(#[case] err: PipelineError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }

    #[test]
    fn test_model_load_message_names_kind() {
        let err = PipelineError::ModelLoad {
            kind: FeatureKind::Smile,
            path: "/tmp/s.xml".into(),
            reason: "empty".into(),
        };
        assert_eq!(err.to_string(), "cannot load smile cascade /tmp/s.xml: empty");
    }
}
