use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::consts::{BACKGROUND_BSPLINE_SUFFIX, FULL_SUFFIX};
use crate::error::{MocoError, Result};

/// A single 2-D image (reference, average, warped frame).
/// Shape = (height, width), row-major.
pub type Image = Array2<u16>;

/// A time series of 16-bit frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Stack {
    /// Sample data, shape = (frames, height, width)
    pub data: Array3<u16>,
}

impl Stack {
    pub fn new(data: Array3<u16>) -> Self {
        Self { data }
    }

    /// Assemble a stack from frames in order. All frames must share one shape.
    pub fn from_frames(frames: Vec<Image>) -> Result<Self> {
        let first = frames.first().ok_or(MocoError::EmptySequence)?;
        let (h, w) = first.dim();
        let mut data = Array3::<u16>::zeros((frames.len(), h, w));
        for (i, frame) in frames.iter().enumerate() {
            if frame.dim() != (h, w) {
                return Err(MocoError::DimensionMismatch {
                    expected: (h, w),
                    actual: frame.dim(),
                });
            }
            data.index_axis_mut(Axis(0), i).assign(frame);
        }
        Ok(Self { data })
    }

    pub fn frame_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// (height, width) of every frame.
    pub fn frame_dim(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn frame(&self, index: usize) -> ArrayView2<'_, u16> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn frames(&self) -> impl Iterator<Item = ArrayView2<'_, u16>> + '_ {
        self.data.outer_iter()
    }

    /// Frames `[0, end)` as a view.
    pub fn head(&self, end: usize) -> ndarray::ArrayView3<'_, u16> {
        self.data.slice(s![..end, .., ..])
    }

    /// Fail unless `other` has this stack's frame dimensions.
    pub fn ensure_frame_dim(&self, other: (usize, usize)) -> Result<()> {
        if self.frame_dim() != other {
            return Err(MocoError::DimensionMismatch {
                expected: self.frame_dim(),
                actual: other,
            });
        }
        Ok(())
    }
}

/// A stack file on disk plus the artifacts known to belong to it.
#[derive(Clone, Debug, PartialEq)]
pub struct StackSource {
    pub path: PathBuf,
    /// File stem; names the `elastix/<experiment>` output tree.
    pub experiment: String,
    /// Background-bspline output of an earlier single-stack correction.
    pub background_bspline: Option<PathBuf>,
}

impl StackSource {
    /// Describe `path`, looking up its background-bspline sibling once.
    pub fn resolve(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sibling = background_bspline_path(&path);
        let background_bspline = sibling.is_file().then_some(sibling);
        Self {
            experiment: experiment_name(&path),
            path,
            background_bspline,
        }
    }

    /// Describe `path` without any prior artifact.
    pub fn bare(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            experiment: experiment_name(&path),
            path,
            background_bspline: None,
        }
    }
}

/// `/data/testdata.tif` -> `testdata`.
pub fn experiment_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Conventional location of the background-bspline artifact for a stack.
///
/// `run_full.tif` -> `run_background_bspline.tif`. Without a `_full` suffix the
/// last `_`-separated segment is dropped instead; a stem without any
/// underscore is kept whole.
pub fn background_bspline_path(path: &Path) -> PathBuf {
    let stem = experiment_name(path);
    let base = match stem.strip_suffix(FULL_SUFFIX) {
        Some(base) => base,
        None => stem.rsplit_once('_').map(|(base, _)| base).unwrap_or(&stem),
    };
    path.with_file_name(format!("{base}{BACKGROUND_BSPLINE_SUFFIX}.tif"))
}

/// Which frame of a stage produced a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSlot {
    Frame { index: usize, count: usize },
    Broadcast,
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame { index, count } => write!(f, "frame {index}/{count}"),
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// Handle to a transform parameter file written by the registration engine.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformArtifact {
    pub path: PathBuf,
    pub stage: String,
    pub slot: FrameSlot,
}

impl TransformArtifact {
    pub fn new(path: impl Into<PathBuf>, stage: impl Into<String>, slot: FrameSlot) -> Self {
        Self {
            path: path.into(),
            stage: stage.into(),
            slot,
        }
    }
}

/// Transforms to apply to a stack: one for every frame, or one per frame.
#[derive(Clone, Debug)]
pub enum TransformSet {
    Broadcast(TransformArtifact),
    PerFrame(Vec<TransformArtifact>),
}

impl TransformSet {
    /// Fail unless a per-frame set covers exactly `frame_count` frames.
    pub(crate) fn check_arity(&self, frame_count: usize) -> Result<()> {
        match self {
            Self::Broadcast(_) => Ok(()),
            Self::PerFrame(list) if list.len() == frame_count => Ok(()),
            Self::PerFrame(list) => Err(MocoError::LengthMismatch {
                expected: frame_count,
                actual: list.len(),
            }),
        }
    }

    pub(crate) fn get(&self, index: usize) -> &TransformArtifact {
        match self {
            Self::Broadcast(t) => t,
            Self::PerFrame(list) => &list[index],
        }
    }
}
