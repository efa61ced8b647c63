mod common;

use std::sync::Arc;

use moco_core::config::ParameterSet;
use moco_core::error::MocoError;
use moco_core::pipeline::NoOpReporter;
use moco_core::register::{
    apply_transforms, register_image, register_stack_to_reference, CancelToken, FrameExecutor,
};
use moco_core::stack::{FrameSlot, Image, TransformArtifact, TransformSet};
use moco_core::workspace::frame_dir;

use common::{executor, ramp_stack, textured_stack, MockEngine};

#[test]
fn test_register_stack_returns_one_transform_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 3);
    let stack = ramp_stack(7, 5, 4, 200);
    let reference = Image::from_elem((5, 4), 200);
    let stage_dir = dir.path().join("affine");

    let result =
        register_stack_to_reference(&exec, &stack, reference.view(), ParameterSet::Affine, &stage_dir)
            .unwrap();

    assert_eq!(engine.computes(), 7);
    assert_eq!(result.transforms.len(), 7);
    assert_eq!(result.stack.frame_count(), 7);
    assert_eq!(result.stack.frame_dim(), (5, 4));
    for (i, t) in result.transforms.iter().enumerate() {
        assert_eq!(t.stage, "affine");
        assert_eq!(t.slot, FrameSlot::Frame { index: i, count: 7 });
        assert_eq!(t.path, stage_dir.join(format!("frame_{i}_7")).join("TransformParameters.0.txt"));
        assert!(t.path.is_file());
        // Identity warp keeps each frame in its slot.
        assert_eq!(result.stack.frame(i)[[0, 0]], 200 + i as u16);
    }
}

#[test]
fn test_register_stack_sequential_matches_parallel_order() {
    let dir = tempfile::tempdir().unwrap();
    let stack = textured_stack(6, 4, 4);
    let reference = stack.frame(0).to_owned();

    let serial = register_stack_to_reference(
        &executor(Arc::new(MockEngine::new()), 1),
        &stack,
        reference.view(),
        ParameterSet::Affine,
        &dir.path().join("serial"),
    )
    .unwrap();
    let parallel = register_stack_to_reference(
        &executor(Arc::new(MockEngine::new()), 4),
        &stack,
        reference.view(),
        ParameterSet::Affine,
        &dir.path().join("parallel"),
    )
    .unwrap();

    assert_eq!(serial.stack, parallel.stack);
    assert_eq!(serial.stack, stack);
}

#[test]
fn test_register_stack_rejects_reference_of_other_size() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 2);
    let stack = ramp_stack(3, 4, 4, 0);
    let reference = Image::zeros((4, 5));

    let err = register_stack_to_reference(
        &exec,
        &stack,
        reference.view(),
        ParameterSet::Affine,
        &dir.path().join("affine"),
    )
    .unwrap_err();

    assert!(matches!(err.root(), MocoError::DimensionMismatch { .. }));
    assert_eq!(engine.computes(), 0);
}

#[test]
fn test_engine_failure_fails_whole_stage() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::failing_on("frame_2_6"));
    let exec = executor(engine.clone(), 2);
    let stack = ramp_stack(6, 3, 3, 0);
    let reference = Image::zeros((3, 3));

    let result = register_stack_to_reference(
        &exec,
        &stack,
        reference.view(),
        ParameterSet::Affine,
        &dir.path().join("affine"),
    );

    let err = result.unwrap_err();
    assert!(matches!(err.root(), MocoError::EngineExecution { exit_code: 1, .. }));
    match err {
        MocoError::Stage { stage, frame, .. } => {
            assert_eq!(stage, "affine");
            assert_eq!(frame, Some(2));
        }
        other => panic!("expected stage context, got {other:?}"),
    }
}

#[test]
fn test_cancelled_run_does_not_invoke_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let cancel = CancelToken::new();
    let exec = FrameExecutor::new(engine.clone(), Some(2), cancel.clone(), Arc::new(NoOpReporter))
        .unwrap();
    cancel.cancel();

    let stack = ramp_stack(5, 3, 3, 0);
    let err = register_stack_to_reference(
        &exec,
        &stack,
        Image::zeros((3, 3)).view(),
        ParameterSet::Affine,
        &dir.path().join("affine"),
    )
    .unwrap_err();

    assert!(matches!(err.root(), MocoError::Cancelled));
    assert_eq!(engine.computes(), 0);
}

#[test]
fn test_register_image_uses_stage_dir_directly() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 2);
    let stage_dir = dir.path().join("global_affine");
    let image = Image::from_elem((4, 4), 10);

    let (warped, artifact) =
        register_image(&exec, image.view(), image.view(), ParameterSet::Affine, &stage_dir)
            .unwrap();

    assert_eq!(warped, image);
    assert_eq!(artifact.slot, FrameSlot::Broadcast);
    assert_eq!(artifact.stage, "global_affine");
    assert_eq!(engine.compute_dirs(), vec![stage_dir]);
}

#[test]
fn test_per_frame_transforms_are_applied_to_matching_frames() {
    // Two sibling stacks of identical shape: transforms estimated on one are
    // applied frame by frame to the other.
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 3);
    let first = textured_stack(5, 6, 7);
    let second = ramp_stack(5, 6, 7, 300);

    let estimated = register_stack_to_reference(
        &exec,
        &first,
        first.frame(0),
        ParameterSet::Affine,
        &dir.path().join("affine"),
    )
    .unwrap();
    let warped = apply_transforms(
        &exec,
        &second,
        &TransformSet::PerFrame(estimated.transforms.clone()),
        &dir.path().join("affine_on_second"),
    )
    .unwrap();

    assert_eq!(warped.frame_count(), second.frame_count());
    assert_eq!(warped.frame_dim(), second.frame_dim());
    assert_eq!(warped, second);

    let calls = engine.applied_calls();
    assert_eq!(calls.len(), 5);
    for call in calls {
        let frame_name = call.work_dir.file_name().unwrap().to_owned();
        let transform_frame = call.transform.parent().unwrap().file_name().unwrap().to_owned();
        assert_eq!(frame_name, transform_frame);
        let index: u16 = frame_name.to_string_lossy().split('_').nth(1).unwrap().parse().unwrap();
        assert_eq!(call.first_pixel, 300 + index);
    }
}

#[test]
fn test_broadcast_applies_one_transform_to_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 2);
    let stack = ramp_stack(4, 3, 3, 0);
    let artifact = TransformArtifact::new(dir.path().join("tp.txt"), "global_affine", FrameSlot::Broadcast);

    let warped = apply_transforms(
        &exec,
        &stack,
        &TransformSet::Broadcast(artifact.clone()),
        &dir.path().join("affine_aligned"),
    )
    .unwrap();

    assert_eq!(warped, stack);
    assert_eq!(engine.computes(), 0);
    let calls = engine.applied_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.transform == artifact.path));
}

#[test]
fn test_transform_count_must_match_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MockEngine::new());
    let exec = executor(engine.clone(), 2);
    let stack = ramp_stack(4, 3, 3, 0);
    let stage_dir = dir.path().join("affine");

    for count in [0usize, 3, 5] {
        let transforms: Vec<_> = (0..count)
            .map(|index| {
                TransformArtifact::new(
                    frame_dir(&stage_dir, index, count).join("TransformParameters.0.txt"),
                    "affine",
                    FrameSlot::Frame { index, count },
                )
            })
            .collect();
        let err = apply_transforms(
            &exec,
            &stack,
            &TransformSet::PerFrame(transforms),
            &dir.path().join("out"),
        )
        .unwrap_err();
        match err.root() {
            MocoError::LengthMismatch { expected, actual } => {
                assert_eq!(*expected, 4);
                assert_eq!(*actual, count);
            }
            other => panic!("expected length mismatch, got {other:?}"),
        }
    }
    assert_eq!(engine.applies(), 0);
}

#[test]
fn test_install_runs_on_bounded_pool() {
    let exec = executor(Arc::new(MockEngine::new()), 3);
    assert_eq!(exec.install(rayon::current_num_threads), 3);
}
