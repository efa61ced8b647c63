use std::fs;
use std::path::Path;

use ndarray::ArrayView2;
use tracing::debug;

use crate::config::{EngineConfig, ParameterSet};
use crate::consts::{ELASTIX_RESULT_FILE, ELASTIX_TRANSFORM_FILE, TRANSFORMIX_RESULT_FILE};
use crate::error::{MocoError, Result};
use crate::io::image_io::save_image;
use crate::io::mhd::{read_mhd, write_mhd};
use crate::stack::{FrameSlot, Image, TransformArtifact};

use super::process::{wait_for_path, EngineCommand};
use super::{clamp_to_u16, RegistrationEngine};

/// elastix/transformix driven as child processes.
///
/// Inputs are exchanged as float32 MetaImage files. A 16-bit TIFF copy of
/// every input and result is left in the work directory for inspection.
#[derive(Clone, Debug)]
pub struct ElastixEngine {
    config: EngineConfig,
}

impl ElastixEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn invoke(&self, command: &EngineCommand, work_dir: &Path, result: &Path) -> Result<()> {
        command.run(
            self.config.timeout(),
            self.config.poll_interval(),
            self.config.verbose,
            work_dir,
        )?;
        let program = command
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        wait_for_path(
            result,
            &program,
            self.config.result_wait(),
            self.config.poll_interval(),
        )
    }

    fn read_result(&self, result: &Path) -> Result<Image> {
        let warped = clamp_to_u16(&read_mhd(result)?);
        save_image(warped.view(), &result.with_extension("tif"))?;
        Ok(warped)
    }
}

/// Create `work_dir` and drop results a previous run left in it, so the
/// result wait only ever sees this invocation's output.
fn prepare_dir(work_dir: &Path) -> Result<()> {
    fs::create_dir_all(work_dir).map_err(|e| MocoError::workspace(work_dir, e))?;
    for name in [ELASTIX_RESULT_FILE, ELASTIX_TRANSFORM_FILE, TRANSFORMIX_RESULT_FILE] {
        let stale = work_dir.join(name);
        match fs::remove_file(&stale) {
            Ok(()) => debug!(path = %stale.display(), "Removed stale engine result"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MocoError::workspace(&stale, e)),
        }
    }
    Ok(())
}

impl RegistrationEngine for ElastixEngine {
    fn compute_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        fixed: ArrayView2<'_, u16>,
        parameters: ParameterSet,
        work_dir: &Path,
    ) -> Result<(Image, TransformArtifact)> {
        prepare_dir(work_dir)?;

        save_image(moving, &work_dir.join("image.tif"))?;
        save_image(fixed, &work_dir.join("ref_image.tif"))?;
        let moving_mhd = work_dir.join("image.mhd");
        let fixed_mhd = work_dir.join("ref_image.mhd");
        write_mhd(moving, &moving_mhd)?;
        write_mhd(fixed, &fixed_mhd)?;

        let parameter_file = self.config.parameter_file(parameters);
        let command = EngineCommand::new(&self.config.elastix_bin)
            .opt("-f", &fixed_mhd)
            .opt("-m", &moving_mhd)
            .opt("-out", work_dir)
            .opt("-p", &parameter_file);

        let result = work_dir.join(ELASTIX_RESULT_FILE);
        self.invoke(&command, work_dir, &result)?;

        let transform_path = work_dir.join(ELASTIX_TRANSFORM_FILE);
        wait_for_path(
            &transform_path,
            "elastix",
            self.config.result_wait(),
            self.config.poll_interval(),
        )?;

        let warped = self.read_result(&result)?;
        debug!(work_dir = %work_dir.display(), %parameters, "elastix finished");
        Ok((
            warped,
            TransformArtifact::new(transform_path, "", FrameSlot::Broadcast),
        ))
    }

    fn apply_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        transform: &TransformArtifact,
        work_dir: &Path,
    ) -> Result<Image> {
        prepare_dir(work_dir)?;

        save_image(moving, &work_dir.join("frame.tif"))?;
        let moving_mhd = work_dir.join("frame.mhd");
        write_mhd(moving, &moving_mhd)?;

        let command = EngineCommand::new(&self.config.transformix_bin)
            .opt("-def", "all")
            .opt("-in", &moving_mhd)
            .opt("-out", work_dir)
            .opt("-tp", &transform.path);

        let result = work_dir.join(TRANSFORMIX_RESULT_FILE);
        self.invoke(&command, work_dir, &result)?;

        let warped = self.read_result(&result)?;
        debug!(work_dir = %work_dir.display(), transform = %transform.path.display(), "transformix finished");
        Ok(warped)
    }

    fn name(&self) -> &str {
        "elastix"
    }
}
