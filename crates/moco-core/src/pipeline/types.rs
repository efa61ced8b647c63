use crate::config::ParameterSet;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Staging,
    Loading,
    Reference,
    Registration { parameters: ParameterSet },
    Decomposition,
    TransformBroadcast,
    Writing,
    Cleanup,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staging => write!(f, "Staging inputs"),
            Self::Loading => write!(f, "Loading stacks"),
            Self::Reference => write!(f, "Building reference"),
            Self::Registration { parameters } => write!(f, "Registering ({parameters})"),
            Self::Decomposition => write!(f, "Splitting signal"),
            Self::TransformBroadcast => write!(f, "Applying transforms"),
            Self::Writing => write!(f, "Writing output"),
            Self::Cleanup => write!(f, "Cleaning up"),
        }
    }
}

/// Progress sink shared by the orchestrators and the frame workers.
///
/// `advance` is called from worker threads. Every method defaults to a no-op.
pub trait ProgressReporter: Send + Sync {
    /// `total_items` is the frame count for per-frame stages.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` frames of the current stage have finished, in any order.
    fn advance(&self, _items_done: usize) {}

    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
