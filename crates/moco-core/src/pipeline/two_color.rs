use tracing::info;

use crate::config::ParameterSet;
use crate::error::{MocoError, Result};
use crate::io::read_stack;
use crate::reference::reference_from_stack;
use crate::register::{apply_transforms, register_stack_to_reference};
use crate::stack::{StackSource, TransformSet};
use crate::workspace::Workspace;

use super::corrector::MotionCorrector;
use super::outputs::TwoColorOutput;
use super::types::PipelineStage;

impl MotionCorrector {
    /// Affine correction of a two-channel acquisition.
    ///
    /// Transforms are estimated on the high-contrast `background` channel
    /// only and applied frame by frame to the `signal` channel.
    pub fn movement_correct_two_color(
        &self,
        ws: &Workspace,
        background: &StackSource,
        signal: &StackSource,
        onset_frame: usize,
    ) -> Result<TwoColorOutput> {
        let reporter = self.exec.reporter();
        info!(
            background = %background.path.display(),
            signal = %signal.path.display(),
            onset_frame,
            "Two-channel correction"
        );

        reporter.begin_stage(PipelineStage::Loading, Some(2));
        let bg = read_stack(&background.path)?;
        let sg = read_stack(&signal.path)?;
        reporter.finish_stage();

        bg.ensure_frame_dim(sg.frame_dim())?;
        if bg.frame_count() != sg.frame_count() {
            return Err(MocoError::LengthMismatch {
                expected: sg.frame_count(),
                actual: bg.frame_count(),
            });
        }

        let reference = reference_from_stack(&bg, onset_frame)?;
        let corrected = register_stack_to_reference(
            &self.exec,
            &bg,
            reference.view(),
            ParameterSet::Affine,
            &ws.stage_dir(&background.experiment, "affine"),
        )?;

        let signal_out = apply_transforms(
            &self.exec,
            &sg,
            &TransformSet::PerFrame(corrected.transforms.clone()),
            &ws.stage_dir(&signal.experiment, "affine_from_bg_on_signal"),
        )?;
        info!(frames = bg.frame_count(), "Two-channel correction complete");

        Ok(TwoColorOutput {
            background: corrected.stack,
            signal: signal_out,
            transforms: corrected.transforms,
        })
    }
}
