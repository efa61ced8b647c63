use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::io::{save_image, write_stack};
use crate::stack::{experiment_name, Image, Stack, TransformArtifact};

/// `<dir>/<stem><suffix>.tif` for an input path.
pub fn sibling_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}{}.tif", experiment_name(input), suffix))
}

/// Everything single-stack correction produces.
#[derive(Clone, Debug)]
pub struct SingleStackOutput {
    pub affine: Stack,
    pub signal: Stack,
    pub background: Stack,
    pub background_bspline: Stack,
    /// Bspline transforms of the background applied to the affine stack.
    pub bspline: Stack,
    pub affine_transforms: Vec<TransformArtifact>,
    pub bspline_transforms: Vec<TransformArtifact>,
}

/// Where [`SingleStackOutput`] is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleStackPaths {
    pub affine: PathBuf,
    pub signal: PathBuf,
    pub background: PathBuf,
    /// Picked up by later multi-stack alignment runs.
    pub background_bspline: PathBuf,
    pub full: PathBuf,
}

impl SingleStackPaths {
    pub fn for_input(input: &Path) -> Self {
        Self {
            affine: sibling_path(input, None, "_affine"),
            signal: sibling_path(input, None, "_signal"),
            background: sibling_path(input, None, "_background"),
            background_bspline: sibling_path(input, None, "_background_bspline"),
            full: sibling_path(input, None, "_full"),
        }
    }
}

impl SingleStackOutput {
    pub fn save(&self, paths: &SingleStackPaths) -> Result<()> {
        write_stack(&self.affine, &paths.affine)?;
        write_stack(&self.signal, &paths.signal)?;
        write_stack(&self.background, &paths.background)?;
        write_stack(&self.background_bspline, &paths.background_bspline)?;
        write_stack(&self.bspline, &paths.full)?;
        info!(output = %paths.full.display(), "Single-stack outputs saved");
        Ok(())
    }
}

/// Result of aligning one stack to its experiment.
#[derive(Clone, Debug)]
pub struct MultiStackOutput {
    pub affine_aligned: Stack,
    pub bspline_aligned: Stack,
    pub global_reference: Image,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiStackPaths {
    pub affine: PathBuf,
    pub bspline: PathBuf,
    pub global_reference: PathBuf,
}

impl MultiStackPaths {
    /// No underscore before `affineglobal`/`bsplineglobal`; downstream list
    /// files split names on underscores.
    pub fn for_input(input: &Path, output_dir: Option<&Path>) -> Self {
        let input_dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            affine: sibling_path(input, output_dir, "affineglobal"),
            bspline: sibling_path(input, output_dir, "bsplineglobal"),
            global_reference: input_dir.join("ref_img_global.tif"),
        }
    }
}

impl MultiStackOutput {
    pub fn save(&self, paths: &MultiStackPaths) -> Result<()> {
        write_stack(&self.affine_aligned, &paths.affine)?;
        write_stack(&self.bspline_aligned, &paths.bspline)?;
        save_image(self.global_reference.view(), &paths.global_reference)?;
        info!(output = %paths.bspline.display(), "Aligned outputs saved");
        Ok(())
    }
}

/// Both channels after two-channel correction.
#[derive(Clone, Debug)]
pub struct TwoColorOutput {
    pub background: Stack,
    pub signal: Stack,
    pub transforms: Vec<TransformArtifact>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TwoColorPaths {
    pub background: PathBuf,
    pub signal: PathBuf,
}

impl TwoColorPaths {
    pub fn for_inputs(background: &Path, signal: &Path) -> Self {
        Self {
            background: sibling_path(background, None, "_bg_moco"),
            signal: sibling_path(signal, None, "_sg_moco"),
        }
    }
}

impl TwoColorOutput {
    pub fn save(&self, paths: &TwoColorPaths) -> Result<()> {
        write_stack(&self.background, &paths.background)?;
        write_stack(&self.signal, &paths.signal)?;
        info!(output = %paths.signal.display(), "Two-channel outputs saved");
        Ok(())
    }
}
