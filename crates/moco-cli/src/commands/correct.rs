use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use moco_core::pipeline::SingleStackJob;
use moco_core::workspace::RunId;

use super::engine::{build_corrector, EngineArgs};
use crate::summary;

#[derive(Args)]
pub struct CorrectArgs {
    /// Input TIFF stack
    pub file: PathBuf,

    /// First frame of the stimulus response; earlier frames form the reference
    #[arg(long)]
    pub onset: usize,

    /// Register against this image instead of the pre-onset mean
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Signal smoothing sigma in pixels
    #[arg(long)]
    pub sigma: Option<f32>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: &CorrectArgs, verbose: bool) -> Result<()> {
    let mut config = args.engine.load_config(verbose)?;
    if let Some(sigma) = args.sigma {
        config.decomposition.sigma = sigma;
    }
    summary::print_run_header("Single-Stack Correction", &[&args.file], &config);

    let job = SingleStackJob {
        input: args.file.clone(),
        onset_frame: args.onset,
        reference: args.reference.clone(),
    };
    let corrector = build_corrector(config)?;
    let paths = corrector
        .run_single(&job, &RunId::from_process())
        .with_context(|| format!("Correction of {} failed", args.file.display()))?;

    summary::print_outputs(&[
        ("Affine", &paths.affine),
        ("Signal", &paths.signal),
        ("Background", &paths.background),
        ("Bg bspline", &paths.background_bspline),
        ("Full", &paths.full),
    ]);
    Ok(())
}
