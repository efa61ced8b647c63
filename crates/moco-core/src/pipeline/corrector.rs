use std::sync::Arc;

use crate::config::MocoConfig;
use crate::engine::RegistrationEngine;
use crate::error::Result;
use crate::register::{CancelToken, FrameExecutor};

use super::types::{NoOpReporter, ProgressReporter};

/// Entry point for the three correction pipelines.
///
/// Holds the run's immutable configuration and the shared frame executor;
/// one instance can serve any number of runs.
pub struct MotionCorrector {
    pub(super) config: MocoConfig,
    pub(super) exec: FrameExecutor,
}

impl MotionCorrector {
    pub fn new(config: MocoConfig, engine: Arc<dyn RegistrationEngine>) -> Result<Self> {
        Self::with_reporter(config, engine, Arc::new(NoOpReporter), CancelToken::new())
    }

    pub fn with_reporter(
        config: MocoConfig,
        engine: Arc<dyn RegistrationEngine>,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let exec = FrameExecutor::new(engine, config.concurrency.workers, cancel, reporter)?;
        Ok(Self { config, exec })
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.exec.cancel_token()
    }
}
