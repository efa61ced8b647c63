use std::path::Path;

use ndarray::ArrayView2;
use tracing::info;

use crate::config::ParameterSet;
use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::stack::{FrameSlot, Image, Stack, TransformArtifact};
use crate::workspace::frame_dir;

use super::FrameExecutor;

/// Output of a per-frame registration stage.
#[derive(Clone, Debug)]
pub struct StageResult {
    /// Warped frames in original order.
    pub stack: Stack,
    /// One transform per frame, `transforms[i]` for frame `i`.
    pub transforms: Vec<TransformArtifact>,
}

pub(crate) fn stage_label(stage_dir: &Path) -> String {
    stage_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Register every frame of `stack` onto `reference`.
///
/// Frame `i` of `n` runs in `stage_dir/frame_<i>_<n>`. Any frame failure
/// fails the stage; no partial stack is returned.
pub fn register_stack_to_reference(
    exec: &FrameExecutor,
    stack: &Stack,
    reference: ArrayView2<'_, u16>,
    parameters: ParameterSet,
    stage_dir: &Path,
) -> Result<StageResult> {
    let stage = stage_label(stage_dir);
    let n = stack.frame_count();
    stack
        .ensure_frame_dim(reference.dim())
        .map_err(|e| e.in_stage(&stage, None))?;
    exec.check_cancelled()?;

    info!(
        stage = %stage,
        frames = n,
        %parameters,
        engine = exec.engine().name(),
        "Registering frames to reference"
    );
    exec.reporter()
        .begin_stage(PipelineStage::Registration { parameters }, Some(n));

    let results = exec.for_each_frame(&stage, n, |i| {
        let dir = frame_dir(stage_dir, i, n);
        let (warped, mut artifact) =
            exec.engine()
                .compute_transform(stack.frame(i), reference, parameters, &dir)?;
        artifact.stage = stage.clone();
        artifact.slot = FrameSlot::Frame { index: i, count: n };
        Ok((warped, artifact))
    });
    exec.reporter().finish_stage();

    let (frames, transforms): (Vec<Image>, Vec<TransformArtifact>) = results?.into_iter().unzip();
    let stack = Stack::from_frames(frames)?;
    info!(stage = %stage, frames = n, "Stage complete");
    Ok(StageResult { stack, transforms })
}

/// Register a single representative image; its transform is meant for
/// broadcasting across a whole stack.
pub fn register_image(
    exec: &FrameExecutor,
    moving: ArrayView2<'_, u16>,
    fixed: ArrayView2<'_, u16>,
    parameters: ParameterSet,
    stage_dir: &Path,
) -> Result<(Image, TransformArtifact)> {
    let stage = stage_label(stage_dir);
    exec.check_cancelled()?;
    info!(stage = %stage, %parameters, engine = exec.engine().name(), "Registering representative image");
    exec.reporter()
        .begin_stage(PipelineStage::Registration { parameters }, Some(1));

    let outcome = exec
        .engine()
        .compute_transform(moving, fixed, parameters, stage_dir)
        .map_err(|e| e.in_stage(&stage, None));
    exec.reporter().finish_stage();

    let (warped, mut artifact) = outcome?;
    artifact.stage = stage;
    artifact.slot = FrameSlot::Broadcast;
    Ok((warped, artifact))
}
