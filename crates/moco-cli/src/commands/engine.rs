use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use moco_core::config::MocoConfig;
use moco_core::engine::ElastixEngine;
use moco_core::pipeline::MotionCorrector;
use moco_core::register::CancelToken;

use crate::interrupt;
use crate::progress::BarReporter;

/// Options shared by every correction command.
#[derive(Args)]
pub struct EngineArgs {
    /// Config file (TOML); flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the parameters_*.txt files
    #[arg(long)]
    pub parameter_dir: Option<PathBuf>,

    /// elastix executable
    #[arg(long)]
    pub elastix: Option<PathBuf>,

    /// transformix executable
    #[arg(long)]
    pub transformix: Option<PathBuf>,

    /// Use the fast *_testing parameter files
    #[arg(long)]
    pub testing: bool,

    /// Number of concurrent engine processes (default: logical CPUs)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Work next to the input instead of in a scratch copy
    #[arg(long)]
    pub in_place: bool,

    /// Scratch directory root
    #[arg(long)]
    pub scratch: Option<PathBuf>,

    /// Keep engine output after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Per-invocation engine timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl EngineArgs {
    pub fn load_config(&self, verbose: bool) -> Result<MocoConfig> {
        let mut config: MocoConfig = if let Some(ref path) = self.config {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid moco config")?
        } else {
            MocoConfig::default()
        };

        if let Some(ref dir) = self.parameter_dir {
            config.engine.parameter_dir = dir.clone();
        }
        if let Some(ref bin) = self.elastix {
            config.engine.elastix_bin = bin.clone();
        }
        if let Some(ref bin) = self.transformix {
            config.engine.transformix_bin = bin.clone();
        }
        if let Some(secs) = self.timeout {
            config.engine.timeout_secs = secs;
        }
        config.engine.testing |= self.testing;
        config.engine.verbose |= verbose;
        if self.workers.is_some() {
            config.concurrency.workers = self.workers;
        }
        if self.in_place {
            config.workspace.use_scratch = false;
        }
        if let Some(ref root) = self.scratch {
            config.workspace.scratch_root = root.clone();
        }
        if self.keep_workspace {
            config.workspace.cleanup = false;
        }
        Ok(config)
    }
}

/// Corrector backed by elastix, reporting to a terminal progress bar.
pub fn build_corrector(config: MocoConfig) -> Result<MotionCorrector> {
    let engine = Arc::new(ElastixEngine::new(config.engine.clone()));
    let cancel = CancelToken::new();
    interrupt::cancel_on_ctrl_c(cancel.clone());
    let corrector = MotionCorrector::with_reporter(
        config,
        engine,
        Arc::new(BarReporter::new()),
        cancel,
    )
    .context("Failed to set up worker pool")?;
    Ok(corrector)
}
