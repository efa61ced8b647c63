use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::config::WorkspaceConfig;
use crate::consts::{ENGINE_DIR_NAME, STAGED_INPUTS_DIR_NAME};
use crate::error::{MocoError, Result};
use crate::stack::StackSource;

/// Identity of one run; names its scratch directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The current process id.
    pub fn from_process() -> Self {
        Self(std::process::id().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-run scratch tree.
///
/// All engine output lands under `<base>/elastix/<experiment>/<stage>/`. In
/// scratch mode `base` is `<scratch_root>/<run id>` and each input is copied
/// to its own `inputs/<k>/` slot; otherwise `base` is the directory holding
/// the input data.
#[derive(Debug)]
pub struct Workspace {
    base: PathBuf,
    scratch: bool,
    cleanup: bool,
    experiments: Mutex<BTreeSet<String>>,
    staged: AtomicUsize,
}

impl Workspace {
    pub fn create(config: &WorkspaceConfig, run_id: &RunId, input_dir: &Path) -> Result<Self> {
        let (base, scratch) = if config.use_scratch {
            let dir = config.scratch_root.join(run_id.to_string());
            fs::create_dir_all(&dir).map_err(|e| MocoError::workspace(&dir, e))?;
            (dir, true)
        } else {
            (input_dir.to_path_buf(), false)
        };
        info!(base = %base.display(), scratch, "Workspace ready");
        Ok(Self {
            base,
            scratch,
            cleanup: config.cleanup,
            experiments: Mutex::new(BTreeSet::new()),
            staged: AtomicUsize::new(0),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Copy `path` into the workspace (scratch mode) and return the copy's path.
    ///
    /// Every call gets a fresh slot, so inputs sharing a file name never
    /// overwrite each other.
    pub fn stage_input(&self, path: &Path) -> Result<PathBuf> {
        if !self.scratch {
            return Ok(path.to_path_buf());
        }
        let name = path
            .file_name()
            .ok_or_else(|| MocoError::Config(format!("not a file path: {}", path.display())))?;
        let slot = self
            .base
            .join(STAGED_INPUTS_DIR_NAME)
            .join(self.staged.fetch_add(1, Ordering::Relaxed).to_string());
        fs::create_dir_all(&slot).map_err(|e| MocoError::workspace(&slot, e))?;
        let target = slot.join(name);
        fs::copy(path, &target).map_err(|e| MocoError::workspace(path, e))?;
        debug!(from = %path.display(), to = %target.display(), "Staged input");
        Ok(target)
    }

    /// Stage a stack and its background-bspline artifact side by side.
    pub fn stage_source(&self, source: &StackSource) -> Result<StackSource> {
        let path = self.stage_input(&source.path)?;
        let background_bspline = source
            .background_bspline
            .as_deref()
            .map(|p| self.stage_input(p))
            .transpose()?;
        Ok(StackSource {
            path,
            experiment: source.experiment.clone(),
            background_bspline,
        })
    }

    pub fn experiment_dir(&self, experiment: &str) -> PathBuf {
        self.base.join(ENGINE_DIR_NAME).join(experiment)
    }

    /// Output directory of one stage; registers the experiment for cleanup.
    pub fn stage_dir(&self, experiment: &str, stage: &str) -> PathBuf {
        if let Ok(mut set) = self.experiments.lock() {
            set.insert(experiment.to_string());
        }
        self.experiment_dir(experiment).join(stage)
    }

    /// Remove everything this run produced, if cleanup is enabled.
    pub fn finish(self) -> Result<()> {
        if !self.cleanup {
            info!(base = %self.base.display(), "Keeping workspace");
            return Ok(());
        }
        if self.scratch {
            remove_tree(&self.base)?;
        } else {
            let experiments = self
                .experiments
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for exp in &experiments {
                remove_tree(&self.base.join(ENGINE_DIR_NAME).join(exp))?;
            }
            // Only succeeds once no other experiment is left in it.
            let _ = fs::remove_dir(self.base.join(ENGINE_DIR_NAME));
        }
        info!(base = %self.base.display(), "Workspace cleaned up");
        Ok(())
    }

    /// Run `body` inside this workspace, then clean up whatever the outcome.
    ///
    /// A body error takes precedence over a cleanup error.
    pub fn scoped<T>(self, body: impl FnOnce(&Workspace) -> Result<T>) -> Result<T> {
        let outcome = body(&self);
        let cleaned = self.finish();
        match (outcome, cleaned) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!(error = %cleanup_err, "Cleanup after failed run also failed");
                Err(e)
            }
        }
    }
}

/// `frame_<i>_<n>` under a stage directory.
pub fn frame_dir(stage_dir: &Path, index: usize, count: usize) -> PathBuf {
    stage_dir.join(format!("frame_{index}_{count}"))
}

fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MocoError::workspace(path, e)),
    }
}
