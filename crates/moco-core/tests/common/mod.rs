#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use moco_core::config::{MocoConfig, ParameterSet};
use moco_core::consts::ELASTIX_TRANSFORM_FILE;
use moco_core::engine::RegistrationEngine;
use moco_core::error::{MocoError, Result};
use moco_core::pipeline::NoOpReporter;
use moco_core::register::{CancelToken, FrameExecutor};
use moco_core::stack::{FrameSlot, Image, Stack, TransformArtifact};
use ndarray::{Array3, ArrayView2};

/// One `apply_transform` call as seen by [`MockEngine`].
#[derive(Clone, Debug)]
pub struct ApplyCall {
    pub work_dir: PathBuf,
    pub transform: PathBuf,
    /// Pixel (0, 0) of the frame handed in.
    pub first_pixel: u16,
}

/// In-process engine: every warp is the identity.
///
/// Transforms are written as small text files so the artifacts point at
/// something real. Calls are counted and recorded.
#[derive(Default)]
pub struct MockEngine {
    pub compute_calls: AtomicUsize,
    pub apply_calls: AtomicUsize,
    pub compute_dirs: Mutex<Vec<PathBuf>>,
    pub applied: Mutex<Vec<ApplyCall>>,
    /// Fail `compute_transform` with exit code 1 when the work dir name matches.
    pub fail_dir: Option<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(dir_name: &str) -> Self {
        Self {
            fail_dir: Some(dir_name.to_string()),
            ..Self::default()
        }
    }

    pub fn computes(&self) -> usize {
        self.compute_calls.load(Ordering::SeqCst)
    }

    pub fn applies(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn applied_calls(&self) -> Vec<ApplyCall> {
        self.applied.lock().unwrap().clone()
    }

    pub fn compute_dirs(&self) -> Vec<PathBuf> {
        self.compute_dirs.lock().unwrap().clone()
    }
}

impl RegistrationEngine for MockEngine {
    fn compute_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        fixed: ArrayView2<'_, u16>,
        parameters: ParameterSet,
        work_dir: &Path,
    ) -> Result<(Image, TransformArtifact)> {
        assert_eq!(moving.dim(), fixed.dim());
        self.compute_calls.fetch_add(1, Ordering::SeqCst);
        self.compute_dirs.lock().unwrap().push(work_dir.to_path_buf());

        let name = work_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_dir.as_deref() == Some(name.as_str()) {
            return Err(MocoError::EngineExecution {
                program: "mock".into(),
                exit_code: 1,
                work_dir: work_dir.to_path_buf(),
            });
        }

        std::fs::create_dir_all(work_dir)?;
        let path = work_dir.join(ELASTIX_TRANSFORM_FILE);
        std::fs::write(&path, format!("(Transform \"{parameters}\")\n"))?;
        Ok((
            moving.to_owned(),
            TransformArtifact::new(path, "", FrameSlot::Broadcast),
        ))
    }

    fn apply_transform(
        &self,
        moving: ArrayView2<'_, u16>,
        transform: &TransformArtifact,
        work_dir: &Path,
    ) -> Result<Image> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.applied.lock().unwrap().push(ApplyCall {
            work_dir: work_dir.to_path_buf(),
            transform: transform.path.clone(),
            first_pixel: moving[[0, 0]],
        });
        std::fs::create_dir_all(work_dir)?;
        Ok(moving.to_owned())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn executor(engine: Arc<dyn RegistrationEngine>, workers: usize) -> FrameExecutor {
    FrameExecutor::new(
        engine,
        Some(workers),
        CancelToken::new(),
        Arc::new(NoOpReporter),
    )
    .unwrap()
}

/// Frame `t` is filled with `base + t`.
pub fn ramp_stack(frames: usize, h: usize, w: usize, base: u16) -> Stack {
    let mut data = Array3::<u16>::zeros((frames, h, w));
    for (t, mut frame) in data.outer_iter_mut().enumerate() {
        frame.fill(base + t as u16);
    }
    Stack::new(data)
}

/// Deterministic textured stack: smooth spatial pattern plus a per-frame offset.
pub fn textured_stack(frames: usize, h: usize, w: usize) -> Stack {
    let data = Array3::from_shape_fn((frames, h, w), |(t, y, x)| {
        (1000 + 40 * y + 25 * x + 10 * t) as u16
    });
    Stack::new(data)
}

/// Config for tests: no scratch copy, nothing kept.
pub fn in_place_config() -> MocoConfig {
    let mut config = MocoConfig::default();
    config.workspace.use_scratch = false;
    config.workspace.cleanup = true;
    config.concurrency.workers = Some(2);
    config
}

/// Config with a scratch root inside `root`.
pub fn scratch_config(root: &Path) -> MocoConfig {
    let mut config = MocoConfig::default();
    config.workspace.scratch_root = root.to_path_buf();
    config.workspace.use_scratch = true;
    config.workspace.cleanup = true;
    config.concurrency.workers = Some(2);
    config
}

/// Every file under `dir`, recursively.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(list_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}
