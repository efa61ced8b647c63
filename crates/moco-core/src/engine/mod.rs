//! Boundary to the external registration engine.
//!
//! Everything above this module talks to a [`RegistrationEngine`]; only
//! [`ElastixEngine`] knows about processes, exchange files and parameter
//! files.

mod elastix;
pub mod process;

use std::path::Path;

use ndarray::ArrayView2;

use crate::config::ParameterSet;
use crate::error::Result;
use crate::stack::{Image, TransformArtifact};

pub use elastix::ElastixEngine;

/// Estimates and applies geometric transforms between 2-D images.
///
/// Implementations must be callable from several worker threads at once;
/// callers guarantee every concurrent call gets its own `work_dir`.
pub trait RegistrationEngine: Send + Sync {
    /// Register `moving` onto `fixed`.
    ///
    /// Returns the warped moving image (clamped to u16) and a handle to the
    /// estimated transform. The artifact's `stage`/`slot` are left for the
    /// caller to fill in.
    fn compute_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        fixed: ArrayView2<'_, u16>,
        parameters: ParameterSet,
        work_dir: &Path,
    ) -> Result<(Image, TransformArtifact)>;

    /// Warp `moving` with an existing transform.
    fn apply_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        transform: &TransformArtifact,
        work_dir: &Path,
    ) -> Result<Image>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Clamp engine output to the u16 range and cast.
pub fn clamp_to_u16(data: &ndarray::Array2<f32>) -> Image {
    data.mapv(|v| {
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, u16::MAX as f32) as u16
        }
    })
}
