use ndarray::{Array3, Axis, Zip};
use rayon::prelude::*;

use crate::config::DecompositionConfig;
use crate::error::Result;
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::reference::reference_from_stack;
use crate::stack::Stack;

/// Signal/background split of an affine-corrected stack.
///
/// Lossy: `background + signal_smoothed` reproduces the corrected stack only
/// where the smoothed signal does not exceed it. Elsewhere the background is
/// clipped at zero and the sum overshoots by `signal_smoothed - corrected`.
#[derive(Clone, Debug)]
pub struct Decomposition {
    /// `corrected - reference`, clipped.
    pub signal: Stack,
    /// Signal blurred per frame (spatial only).
    pub signal_smoothed: Stack,
    /// `corrected - signal_smoothed`, clipped.
    pub background: Stack,
}

/// Split `corrected` using the mean of its first `onset_frame` frames as the
/// baseline.
///
/// Frames are blurred in parallel on the current rayon pool; run it inside
/// [`FrameExecutor::install`](crate::register::FrameExecutor::install) to
/// keep it on the run's bounded workers.
pub fn decompose(
    corrected: &Stack,
    onset_frame: usize,
    config: &DecompositionConfig,
) -> Result<Decomposition> {
    let reference = reference_from_stack(corrected, onset_frame)?;
    let ceiling = config.clip_max as f32;

    let mut signal = Array3::<u16>::zeros(corrected.data.dim());
    for (mut out, frame) in signal.outer_iter_mut().zip(corrected.frames()) {
        Zip::from(&mut out)
            .and(&frame)
            .and(&reference)
            .for_each(|o, &v, &r| *o = (v as f32 - r as f32).clamp(0.0, ceiling) as u16);
    }

    let mut smoothed = Array3::<u16>::zeros(corrected.data.dim());
    smoothed
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(signal.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut out, frame)| {
            let blurred = gaussian_blur_array(frame.mapv(|v| v as f32).view(), config.sigma);
            Zip::from(&mut out)
                .and(&blurred)
                .for_each(|o, &b| *o = truncate_sample(b, ceiling));
        });

    let mut background = Array3::<u16>::zeros(corrected.data.dim());
    Zip::from(&mut background)
        .and(&corrected.data)
        .and(&smoothed)
        .for_each(|o, &v, &s| *o = (v as f32 - s as f32).clamp(0.0, ceiling) as u16);

    Ok(Decomposition {
        signal: Stack::new(signal),
        signal_smoothed: Stack::new(smoothed),
        background: Stack::new(background),
    })
}

/// Integer-typed filter output truncates; the small offset keeps a flat frame
/// flat when the kernel weights sum to slightly under one.
fn truncate_sample(v: f32, ceiling: f32) -> u16 {
    (v + 1.0e-3).clamp(0.0, ceiling) as u16
}
