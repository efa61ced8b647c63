/// Minimum frame count to dispatch frames onto the worker pool.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Largest representable sample value; engine output is clamped to this.
pub const SAMPLE_MAX: u16 = u16::MAX;

/// Gaussian sigma applied to the signal component before subtraction.
pub const DEFAULT_SIGNAL_SIGMA: f32 = 0.75;

/// Kernel half-width in units of sigma.
pub const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// Frames averaged for a stack's own representative image during global
/// alignment when no background-bspline artifact exists.
pub const DEFAULT_FALLBACK_ONSET_FRAME: usize = 20;

/// Deadline for a single elastix/transformix process.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 900;

/// Deadline for the engine's result files to become visible after exit.
pub const DEFAULT_RESULT_WAIT_SECS: u64 = 60;

/// Interval between process/file polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Directory under the workspace base holding all engine output.
pub const ENGINE_DIR_NAME: &str = "elastix";

/// Directory under a scratch workspace holding copied inputs.
pub const STAGED_INPUTS_DIR_NAME: &str = "inputs";

/// Suffix of the sibling artifact written by single-stack correction.
pub const BACKGROUND_BSPLINE_SUFFIX: &str = "_background_bspline";

/// Stem suffix stripped before appending [`BACKGROUND_BSPLINE_SUFFIX`].
pub const FULL_SUFFIX: &str = "_full";

/// elastix writes its warped moving image here.
pub const ELASTIX_RESULT_FILE: &str = "result.0.mhd";

/// elastix writes the estimated transform here.
pub const ELASTIX_TRANSFORM_FILE: &str = "TransformParameters.0.txt";

/// transformix writes its warped image here.
pub const TRANSFORMIX_RESULT_FILE: &str = "result.mhd";
