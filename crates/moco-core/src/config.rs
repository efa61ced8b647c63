use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ENGINE_TIMEOUT_SECS, DEFAULT_FALLBACK_ONSET_FRAME, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RESULT_WAIT_SECS, DEFAULT_SIGNAL_SIGMA, SAMPLE_MAX,
};
use crate::error::MocoError;

/// Everything a run needs to know about its environment.
///
/// Built once (usually from TOML) and handed to the orchestrators; nothing
/// reads process-wide state after that.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MocoConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub decomposition: DecompositionConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub elastix_bin: PathBuf,
    pub transformix_bin: PathBuf,
    /// Directory holding `parameters_<set>.txt` files.
    pub parameter_dir: PathBuf,
    /// Use the low-fidelity `*_testing` parameter files.
    pub testing: bool,
    /// Forward engine stdout/stderr instead of discarding it.
    pub verbose: bool,
    pub timeout_secs: u64,
    pub result_wait_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elastix_bin: PathBuf::from("elastix"),
            transformix_bin: PathBuf::from("transformix"),
            parameter_dir: PathBuf::from("."),
            testing: false,
            verbose: false,
            timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            result_wait_secs: DEFAULT_RESULT_WAIT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn result_wait(&self) -> Duration {
        Duration::from_secs(self.result_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Parameter file for `set`, honoring the testing switch.
    pub fn parameter_file(&self, set: ParameterSet) -> PathBuf {
        let suffix = if self.testing { "_testing" } else { "" };
        self.parameter_dir
            .join(format!("parameters_{}{}.txt", set.file_stem(), suffix))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent of the per-run scratch directories.
    pub scratch_root: PathBuf,
    /// Copy inputs into `<scratch_root>/<run id>` before processing.
    pub use_scratch: bool,
    /// Remove engine output (and the scratch copy) after the run.
    pub cleanup: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
            use_scratch: true,
            cleanup: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Spatial Gaussian sigma for the signal component.
    pub sigma: f32,
    /// Upper clip bound for signal and background.
    pub clip_max: u16,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGNAL_SIGMA,
            clip_max: SAMPLE_MAX,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub reference_mode: ReferenceMode,
    pub fallback_onset_frame: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            reference_mode: ReferenceMode::First,
            fallback_onset_frame: DEFAULT_FALLBACK_ONSET_FRAME,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Worker threads per stage. `None` = one per logical CPU.
    pub workers: Option<usize>,
}

/// How the cross-stack global reference is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    /// Reference of the first sibling stack.
    #[default]
    First,
    /// Mean over all sibling references.
    Global,
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Global => write!(f, "global"),
        }
    }
}

impl FromStr for ReferenceMode {
    type Err = MocoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "global" => Ok(Self::Global),
            other => Err(MocoError::Config(format!(
                "unknown reference mode '{other}' (expected 'first' or 'global')"
            ))),
        }
    }
}

/// Named elastix parameter bundles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSet {
    Affine,
    Bspline,
    BsplineLowres,
}

impl ParameterSet {
    fn file_stem(self) -> &'static str {
        match self {
            Self::Affine => "affine",
            Self::Bspline => "bspline",
            Self::BsplineLowres => "bspline_lowres",
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}
