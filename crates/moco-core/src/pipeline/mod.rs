pub mod outputs;
pub mod runs;
mod corrector;
mod multi;
mod single;
mod two_color;
mod types;

pub use corrector::MotionCorrector;
pub use outputs::{
    MultiStackOutput, MultiStackPaths, SingleStackOutput, SingleStackPaths, TwoColorOutput,
    TwoColorPaths,
};
pub use runs::{read_sibling_list, MultiStackJob, SingleStackJob, TwoColorJob};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
