use tracing::info;

use crate::config::{ParameterSet, ReferenceMode};
use crate::error::{MocoError, Result};
use crate::io::read_stack;
use crate::reference::{build_ref_set, global_reference, reference_from_stack, temporal_mean};
use crate::register::{apply_transforms, register_image};
use crate::stack::{experiment_name, StackSource, TransformSet};
use crate::workspace::Workspace;

use super::corrector::MotionCorrector;
use super::outputs::MultiStackOutput;
use super::types::PipelineStage;

impl MotionCorrector {
    /// Align one stack of an experiment to a reference shared by all of its
    /// sibling stacks.
    ///
    /// One affine and one bspline transform are estimated from averaged
    /// images and broadcast to every frame; per-frame estimation is too noisy
    /// for cross-stack alignment.
    pub fn align_tstacks(
        &self,
        ws: &Workspace,
        source: &StackSource,
        siblings: &[StackSource],
        mode: ReferenceMode,
    ) -> Result<MultiStackOutput> {
        let reporter = self.exec.reporter();
        let exp = source.experiment.as_str();
        if siblings.is_empty() {
            return Err(MocoError::EmptySequence);
        }
        info!(
            input = %source.path.display(),
            siblings = siblings.len(),
            %mode,
            "Multi-stack alignment"
        );

        reporter.begin_stage(PipelineStage::Reference, Some(siblings.len()));
        let ref_set = build_ref_set(siblings, None)?;
        let global = global_reference(&ref_set, mode)?;
        reporter.finish_stage();

        reporter.begin_stage(PipelineStage::Loading, None);
        let data = read_stack(&source.path)?;
        data.ensure_frame_dim(global.dim())?;
        let prior = source
            .background_bspline
            .as_deref()
            .filter(|p| p.is_file())
            .map(|p| read_stack(p).map(|stack| (experiment_name(p), stack)))
            .transpose()?;
        reporter.finish_stage();

        let representative = match &prior {
            Some((_, stack)) => temporal_mean(stack)?,
            None => {
                let onset = self
                    .config
                    .alignment
                    .fallback_onset_frame
                    .min(data.frame_count());
                reference_from_stack(&data, onset)?
            }
        };

        let (_, affine) = register_image(
            &self.exec,
            representative.view(),
            global.view(),
            ParameterSet::Affine,
            &ws.stage_dir(exp, "global_affine"),
        )?;
        let affine = TransformSet::Broadcast(affine);
        let affine_aligned =
            apply_transforms(&self.exec, &data, &affine, &ws.stage_dir(exp, "affine_aligned"))?;
        drop(data);

        let post_affine_mean = match &prior {
            Some((prior_exp, stack)) => {
                let aligned = apply_transforms(
                    &self.exec,
                    stack,
                    &affine,
                    &ws.stage_dir(prior_exp, "bspline_affine_aligned"),
                )?;
                temporal_mean(&aligned)?
            }
            None => temporal_mean(&affine_aligned)?,
        };

        let (_, bspline) = register_image(
            &self.exec,
            post_affine_mean.view(),
            global.view(),
            ParameterSet::BsplineLowres,
            &ws.stage_dir(exp, "global_bspline"),
        )?;
        let bspline_aligned = apply_transforms(
            &self.exec,
            &affine_aligned,
            &TransformSet::Broadcast(bspline),
            &ws.stage_dir(exp, "bspline_aligned"),
        )?;
        info!(experiment = exp, "Multi-stack alignment complete");

        Ok(MultiStackOutput {
            affine_aligned,
            bspline_aligned,
            global_reference: global,
        })
    }
}
