use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use moco_core::pipeline::TwoColorJob;
use moco_core::workspace::RunId;

use super::engine::{build_corrector, EngineArgs};
use crate::summary;

#[derive(Args)]
pub struct TwoColorArgs {
    /// Background (structural) channel; transforms are estimated on it
    pub background: PathBuf,

    /// Signal channel; transforms are applied to it
    pub signal: PathBuf,

    /// First frame of the stimulus response
    #[arg(long)]
    pub onset: usize,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: &TwoColorArgs, verbose: bool) -> Result<()> {
    let config = args.engine.load_config(verbose)?;
    summary::print_run_header(
        "Two-Channel Correction",
        &[&args.background, &args.signal],
        &config,
    );

    let job = TwoColorJob {
        background: args.background.clone(),
        signal: args.signal.clone(),
        onset_frame: args.onset,
    };
    let corrector = build_corrector(config)?;
    let paths = corrector
        .run_two_color(&job, &RunId::from_process())
        .context("Two-channel correction failed")?;

    summary::print_outputs(&[
        ("Background", &paths.background),
        ("Signal", &paths.signal),
    ]);
    Ok(())
}
