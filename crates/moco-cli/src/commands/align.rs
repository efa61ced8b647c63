use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use moco_core::config::ReferenceMode;
use moco_core::pipeline::{read_sibling_list, MultiStackJob};
use moco_core::workspace::RunId;

use super::engine::{build_corrector, EngineArgs};
use crate::summary;

fn parse_reference_mode(s: &str) -> std::result::Result<ReferenceMode, String> {
    s.parse::<ReferenceMode>().map_err(|e| e.to_string())
}

#[derive(Args)]
pub struct AlignArgs {
    /// Stack to align
    pub file: PathBuf,

    /// Sibling stacks of the same experiment
    #[arg(long, num_args = 1..)]
    pub siblings: Vec<PathBuf>,

    /// File listing sibling stacks, one per line
    #[arg(long)]
    pub sibling_list: Option<PathBuf>,

    /// How the shared reference is built: first or global (default from config)
    #[arg(long, value_parser = parse_reference_mode)]
    pub mode: Option<ReferenceMode>,

    /// Subdirectory of the input directory for the aligned stacks
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: &AlignArgs, verbose: bool) -> Result<()> {
    let config = args.engine.load_config(verbose)?;

    let mut siblings = args.siblings.clone();
    if let Some(ref list) = args.sibling_list {
        let listed = read_sibling_list(list)
            .with_context(|| format!("Failed to read sibling list {}", list.display()))?;
        siblings.extend(listed);
    }
    if siblings.is_empty() {
        bail!("No sibling stacks given; use --siblings or --sibling-list");
    }

    let job = MultiStackJob {
        input: args.file.clone(),
        siblings,
        output_subdir: args.output_dir.clone(),
        reference_mode: args.mode.unwrap_or(config.alignment.reference_mode),
    };
    summary::print_run_header("Multi-Stack Alignment", &[&args.file], &config);
    summary::print_alignment(&job);

    let corrector = build_corrector(config)?;
    let paths = corrector
        .run_multi(&job, &RunId::from_process())
        .with_context(|| format!("Alignment of {} failed", args.file.display()))?;

    summary::print_outputs(&[
        ("Affine", &paths.affine),
        ("Bspline", &paths.bspline),
        ("Reference", &paths.global_reference),
    ]);
    Ok(())
}
