//! Whole-run drivers: workspace setup, input staging, correction, saving,
//! cleanup. Outputs are always written next to the original inputs, never
//! into the scratch copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ReferenceMode;
use crate::error::{MocoError, Result};
use crate::io::load_image;
use crate::stack::StackSource;
use crate::workspace::{RunId, Workspace};

use super::corrector::MotionCorrector;
use super::outputs::{MultiStackPaths, SingleStackPaths, TwoColorPaths};
use super::types::PipelineStage;

/// One single-stack correction request.
#[derive(Clone, Debug)]
pub struct SingleStackJob {
    pub input: PathBuf,
    pub onset_frame: usize,
    /// Image to register against instead of the pre-onset mean.
    pub reference: Option<PathBuf>,
}

/// Align `input` to the reference built from `siblings`.
#[derive(Clone, Debug)]
pub struct MultiStackJob {
    pub input: PathBuf,
    pub siblings: Vec<PathBuf>,
    /// Subdirectory of the input directory for the aligned stacks.
    pub output_subdir: Option<PathBuf>,
    pub reference_mode: ReferenceMode,
}

#[derive(Clone, Debug)]
pub struct TwoColorJob {
    pub background: PathBuf,
    pub signal: PathBuf,
    pub onset_frame: usize,
}

/// Parse a sibling list file: one stack path per line, blank lines ignored.
/// Relative entries are resolved against the list file's directory.
pub fn read_sibling_list(path: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| dir.join(line))
        .collect())
}

fn input_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl MotionCorrector {
    pub fn run_single(&self, job: &SingleStackJob, run_id: &RunId) -> Result<SingleStackPaths> {
        let reference = job.reference.as_deref().map(load_image).transpose()?;
        let paths = SingleStackPaths::for_input(&job.input);
        let ws = Workspace::create(&self.config.workspace, run_id, &input_dir(&job.input))?;
        let reporter = self.exec.reporter().clone();

        ws.scoped(|ws| {
            reporter.begin_stage(PipelineStage::Staging, None);
            let source = ws.stage_source(&StackSource::bare(&job.input))?;
            reporter.finish_stage();

            let output = self.movement_correct_tstack(ws, &source, job.onset_frame, reference)?;

            reporter.begin_stage(PipelineStage::Writing, None);
            output.save(&paths)?;
            reporter.finish_stage();
            reporter.begin_stage(PipelineStage::Cleanup, None);
            Ok(())
        })?;
        reporter.finish_stage();
        info!(input = %job.input.display(), "Single-stack run finished");
        Ok(paths)
    }

    pub fn run_multi(&self, job: &MultiStackJob, run_id: &RunId) -> Result<MultiStackPaths> {
        if job.siblings.is_empty() {
            return Err(MocoError::EmptySequence);
        }
        let dir = input_dir(&job.input);
        let output_dir = job.output_subdir.as_ref().map(|sub| dir.join(sub));
        if let Some(out) = &output_dir {
            fs::create_dir_all(out).map_err(|e| MocoError::workspace(out, e))?;
        }
        let paths = MultiStackPaths::for_input(&job.input, output_dir.as_deref());
        let ws = Workspace::create(&self.config.workspace, run_id, &dir)?;
        let reporter = self.exec.reporter().clone();

        ws.scoped(|ws| {
            reporter.begin_stage(PipelineStage::Staging, Some(job.siblings.len() + 1));
            let source = ws.stage_source(&StackSource::resolve(&job.input))?;
            let siblings = job
                .siblings
                .iter()
                .map(|p| ws.stage_source(&StackSource::resolve(p)))
                .collect::<Result<Vec<_>>>()?;
            reporter.finish_stage();

            let output = self.align_tstacks(ws, &source, &siblings, job.reference_mode)?;

            reporter.begin_stage(PipelineStage::Writing, None);
            output.save(&paths)?;
            reporter.finish_stage();
            reporter.begin_stage(PipelineStage::Cleanup, None);
            Ok(())
        })?;
        reporter.finish_stage();
        info!(input = %job.input.display(), "Multi-stack run finished");
        Ok(paths)
    }

    pub fn run_two_color(&self, job: &TwoColorJob, run_id: &RunId) -> Result<TwoColorPaths> {
        let paths = TwoColorPaths::for_inputs(&job.background, &job.signal);
        let ws = Workspace::create(&self.config.workspace, run_id, &input_dir(&job.background))?;
        let reporter = self.exec.reporter().clone();

        ws.scoped(|ws| {
            reporter.begin_stage(PipelineStage::Staging, Some(2));
            let background = ws.stage_source(&StackSource::bare(&job.background))?;
            let signal = ws.stage_source(&StackSource::bare(&job.signal))?;
            reporter.finish_stage();

            let output =
                self.movement_correct_two_color(ws, &background, &signal, job.onset_frame)?;

            reporter.begin_stage(PipelineStage::Writing, None);
            output.save(&paths)?;
            reporter.finish_stage();
            reporter.begin_stage(PipelineStage::Cleanup, None);
            Ok(())
        })?;
        reporter.finish_stage();
        info!(background = %job.background.display(), "Two-channel run finished");
        Ok(paths)
    }
}
