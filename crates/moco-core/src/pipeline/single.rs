use tracing::info;

use crate::config::ParameterSet;
use crate::decompose::decompose;
use crate::error::{MocoError, Result};
use crate::io::read_stack;
use crate::reference::{reference_from_stack, temporal_mean};
use crate::register::{apply_transforms, register_stack_to_reference};
use crate::stack::{Image, StackSource, TransformSet};
use crate::workspace::Workspace;

use super::corrector::MotionCorrector;
use super::outputs::SingleStackOutput;
use super::types::PipelineStage;

impl MotionCorrector {
    /// Two-pass correction of one stack: affine against the pre-onset mean,
    /// then bspline estimated on the background and applied to the affine
    /// result.
    ///
    /// `reference` replaces the pre-onset mean for the affine pass.
    pub fn movement_correct_tstack(
        &self,
        ws: &Workspace,
        source: &StackSource,
        onset_frame: usize,
        reference: Option<Image>,
    ) -> Result<SingleStackOutput> {
        let reporter = self.exec.reporter();
        let exp = source.experiment.as_str();
        info!(input = %source.path.display(), onset_frame, "Single-stack correction");

        reporter.begin_stage(PipelineStage::Loading, None);
        let data = read_stack(&source.path)?;
        reporter.finish_stage();

        let n = data.frame_count();
        if onset_frame == 0 || onset_frame > n {
            return Err(MocoError::InvalidRange {
                onset: onset_frame,
                frame_count: n,
            });
        }

        reporter.begin_stage(PipelineStage::Reference, None);
        let reference = match reference {
            Some(r) => {
                data.ensure_frame_dim(r.dim())?;
                r
            }
            None => reference_from_stack(&data, onset_frame)?,
        };
        reporter.finish_stage();

        let affine = register_stack_to_reference(
            &self.exec,
            &data,
            reference.view(),
            ParameterSet::Affine,
            &ws.stage_dir(exp, "affine"),
        )?;
        drop(data);

        reporter.begin_stage(PipelineStage::Decomposition, None);
        let parts = self
            .exec
            .install(|| decompose(&affine.stack, onset_frame, &self.config.decomposition))?;
        let background_reference = temporal_mean(&parts.background)?;
        reporter.finish_stage();

        let background_bspline = register_stack_to_reference(
            &self.exec,
            &parts.background,
            background_reference.view(),
            ParameterSet::Bspline,
            &ws.stage_dir(exp, "bspline"),
        )?;

        let bspline_transforms = background_bspline.transforms;
        let bspline = apply_transforms(
            &self.exec,
            &affine.stack,
            &TransformSet::PerFrame(bspline_transforms.clone()),
            &ws.stage_dir(exp, "bspline_on_signal"),
        )?;
        info!(experiment = exp, frames = n, "Single-stack correction complete");

        Ok(SingleStackOutput {
            affine: affine.stack,
            signal: parts.signal,
            background: parts.background,
            background_bspline: background_bspline.stack,
            bspline,
            affine_transforms: affine.transforms,
            bspline_transforms,
        })
    }
}
