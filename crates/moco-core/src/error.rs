use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MocoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Onset frame {onset} out of range (frames: {frame_count})")]
    InvalidRange { onset: usize, frame_count: usize },

    #[error("{program} exited with code {exit_code} (work dir: {})", work_dir.display())]
    EngineExecution {
        program: String,
        exit_code: i32,
        work_dir: PathBuf,
    },

    #[error("{program} did not produce {} within {timeout:?}", waited_for.display())]
    EngineTimeout {
        program: String,
        waited_for: PathBuf,
        timeout: Duration,
    },

    #[error("Transform count {actual} does not match frame count {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Workspace error at {}: {cause}", path.display())]
    Workspace { path: PathBuf, cause: std::io::Error },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid MetaImage file {}: {reason}", path.display())]
    InvalidMhd { path: PathBuf, reason: String },

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Stage '{stage}'{}: {cause}", frame.map(|i| format!(" frame {i}")).unwrap_or_default())]
    Stage {
        stage: String,
        frame: Option<usize>,
        cause: Box<MocoError>,
    },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

impl MocoError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            cause,
        }
    }

    pub(crate) fn in_stage(self, stage: &str, frame: Option<usize>) -> Self {
        Self::Stage {
            stage: stage.to_string(),
            frame,
            cause: Box::new(self),
        }
    }

    /// The innermost error, with any stage context stripped.
    pub fn root(&self) -> &MocoError {
        match self {
            Self::Stage { cause, .. } => cause.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, MocoError>;
