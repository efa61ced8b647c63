//! Frame-level fan-out of registration calls.
//!
//! [`stage`] estimates one transform per frame against a fixed reference;
//! [`broadcast`] re-applies existing transforms without estimating new ones.
//! Both dispatch frames onto a bounded worker pool, each frame in its own
//! `frame_<i>_<n>` directory, and fail the whole stage on the first error.

pub mod broadcast;
pub mod stage;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::engine::RegistrationEngine;
use crate::error::{MocoError, Result};
use crate::pipeline::ProgressReporter;

pub use broadcast::apply_transforms;
pub use stage::{register_image, register_stack_to_reference, StageResult};

/// Run-level cancellation flag.
///
/// Once set, frames that have not started yet fail with
/// [`MocoError::Cancelled`]; frames already handed to the engine finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine, worker pool and run-level hooks shared by every stage of a run.
pub struct FrameExecutor {
    engine: Arc<dyn RegistrationEngine>,
    pool: ThreadPool,
    cancel: CancelToken,
    reporter: Arc<dyn ProgressReporter>,
}

impl FrameExecutor {
    /// `workers = None` sizes the pool to the number of logical CPUs.
    pub fn new(
        engine: Arc<dyn RegistrationEngine>,
        workers: Option<usize>,
        cancel: CancelToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.unwrap_or(0))
            .thread_name(|i| format!("moco-frame-{i}"))
            .build()
            .map_err(|e| MocoError::Pipeline(format!("worker pool: {e}")))?;
        Ok(Self {
            engine,
            pool,
            cancel,
            reporter,
        })
    }

    pub fn engine(&self) -> &dyn RegistrationEngine {
        self.engine.as_ref()
    }

    pub fn reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.reporter
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run `op` on this executor's worker pool.
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MocoError::Cancelled);
        }
        Ok(())
    }

    /// Run `work` for every frame index in `[0, count)`, results in index order.
    ///
    /// Errors are tagged with `stage` and the frame index. The first failure
    /// stops further dispatch.
    pub(crate) fn for_each_frame<T, F>(&self, stage: &str, count: usize, work: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Send + Sync,
    {
        let done = AtomicUsize::new(0);
        let run_one = |i: usize| -> Result<T> {
            if self.cancel.is_cancelled() {
                return Err(MocoError::Cancelled.in_stage(stage, Some(i)));
            }
            let out = work(i).map_err(|e| e.in_stage(stage, Some(i)))?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            self.reporter.advance(n);
            Ok(out)
        };

        if count >= PARALLEL_FRAME_THRESHOLD && self.pool.current_num_threads() > 1 {
            self.pool
                .install(|| (0..count).into_par_iter().map(run_one).collect())
        } else {
            (0..count).map(run_one).collect()
        }
    }
}
