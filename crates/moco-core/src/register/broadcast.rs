use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::pipeline::PipelineStage;
use crate::stack::{Stack, TransformSet};
use crate::workspace::frame_dir;

use super::stage::stage_label;
use super::FrameExecutor;

/// Warp every frame of `stack` with previously computed transforms.
///
/// A [`TransformSet::PerFrame`] set must hold exactly one artifact per frame;
/// the arity check happens before any engine call. The output keeps the input
/// stack's dimensions and frame order.
pub fn apply_transforms(
    exec: &FrameExecutor,
    stack: &Stack,
    transforms: &TransformSet,
    stage_dir: &Path,
) -> Result<Stack> {
    let stage = stage_label(stage_dir);
    let n = stack.frame_count();
    transforms
        .check_arity(n)
        .map_err(|e| e.in_stage(&stage, None))?;
    exec.check_cancelled()?;

    let mode = match transforms {
        TransformSet::Broadcast(_) => "broadcast",
        TransformSet::PerFrame(_) => "per-frame",
    };
    info!(stage = %stage, frames = n, mode, engine = exec.engine().name(), "Applying transforms");
    exec.reporter()
        .begin_stage(PipelineStage::TransformBroadcast, Some(n));

    let frames = exec.for_each_frame(&stage, n, |i| {
        let dir = frame_dir(stage_dir, i, n);
        exec.engine()
            .apply_transform(stack.frame(i), transforms.get(i), &dir)
    });
    exec.reporter().finish_stage();

    let warped = Stack::from_frames(frames?)?;
    warped.ensure_frame_dim(stack.frame_dim())?;
    Ok(warped)
}
