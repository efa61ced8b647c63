mod common;

use moco_core::config::DecompositionConfig;
use moco_core::decompose::decompose;
use moco_core::error::MocoError;
use moco_core::stack::Stack;
use ndarray::Array3;

use common::{ramp_stack, textured_stack};

#[test]
fn test_signal_is_zero_before_onset_for_static_stack() {
    let stack = Stack::new(Array3::from_elem((6, 8, 8), 1500u16));
    let parts = decompose(&stack, 3, &DecompositionConfig::default()).unwrap();

    assert!(parts.signal.data.iter().all(|&v| v == 0));
    assert!(parts.signal_smoothed.data.iter().all(|&v| v == 0));
    assert_eq!(parts.background, stack);
}

#[test]
fn test_signal_is_difference_from_baseline() {
    // Frames hold 100..=105; baseline (onset 2) is 100.
    let stack = ramp_stack(6, 5, 5, 100);
    let parts = decompose(&stack, 2, &DecompositionConfig::default()).unwrap();

    for t in 0..6 {
        let expected = (100 + t as u16).saturating_sub(100);
        assert!(parts.signal.frame(t).iter().all(|&v| v == expected));
        // A spatially flat frame stays flat after blurring.
        assert!(parts.signal_smoothed.frame(t).iter().all(|&v| v == expected));
    }
}

#[test]
fn test_signal_clips_negative_differences() {
    let mut data = Array3::from_elem((3, 4, 4), 800u16);
    data.index_axis_mut(ndarray::Axis(0), 2).fill(100);
    let parts = decompose(&Stack::new(data), 2, &DecompositionConfig::default()).unwrap();
    assert!(parts.signal.frame(2).iter().all(|&v| v == 0));
}

#[test]
fn test_background_plus_smoothed_bounds_corrected() {
    let mut stack = textured_stack(8, 16, 16);
    // Local bright spot after onset.
    for t in 4..8 {
        stack.data[[t, 8, 8]] = 9000;
        stack.data[[t, 8, 9]] = 7000;
    }
    let parts = decompose(&stack, 4, &DecompositionConfig::default()).unwrap();

    for ((&c, &s), &b) in stack
        .data
        .iter()
        .zip(parts.signal_smoothed.data.iter())
        .zip(parts.background.data.iter())
    {
        let sum = b as u32 + s as u32;
        assert!(sum >= c as u32);
        assert_eq!(sum, (c as u32).max(s as u32));
    }
}

#[test]
fn test_outputs_keep_stack_shape() {
    let stack = textured_stack(5, 9, 11);
    let parts = decompose(&stack, 2, &DecompositionConfig::default()).unwrap();
    assert_eq!(parts.signal.data.dim(), (5, 9, 11));
    assert_eq!(parts.signal_smoothed.data.dim(), (5, 9, 11));
    assert_eq!(parts.background.data.dim(), (5, 9, 11));
}

#[test]
fn test_clip_max_caps_signal() {
    let mut data = Array3::from_elem((3, 4, 4), 0u16);
    data.index_axis_mut(ndarray::Axis(0), 2).fill(5000);
    let config = DecompositionConfig {
        sigma: 0.75,
        clip_max: 1000,
    };
    let parts = decompose(&Stack::new(data), 2, &config).unwrap();
    assert!(parts.signal.frame(2).iter().all(|&v| v == 1000));
    assert!(parts.background.data.iter().all(|&v| v <= 1000));
}

#[test]
fn test_decompose_rejects_zero_onset() {
    let stack = ramp_stack(3, 2, 2, 0);
    let err = decompose(&stack, 0, &DecompositionConfig::default()).unwrap_err();
    assert!(matches!(err, MocoError::InvalidRange { onset: 0, .. }));
}

#[test]
fn test_smoothed_signal_is_truncated() {
    // One bright pixel after onset; sigma 0.75 spreads 282.9 of it onto the centre.
    let mut data = Array3::from_elem((3, 9, 9), 0u16);
    data[[2, 4, 4]] = 1000;
    let parts = decompose(&Stack::new(data), 2, &DecompositionConfig::default()).unwrap();

    let smoothed = parts.signal_smoothed.frame(2);
    assert_eq!(smoothed[[4, 4]], 282);
    assert_eq!(smoothed[[4, 5]], 116);
    assert_eq!(smoothed[[3, 3]], 47);
}
