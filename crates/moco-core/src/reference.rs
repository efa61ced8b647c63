use ndarray::{Array2, ArrayView3, Axis};
use tracing::debug;

use crate::config::ReferenceMode;
use crate::error::{MocoError, Result};
use crate::io::read_stack;
use crate::stack::{Image, Stack, StackSource};

/// One reference per sibling stack of an experiment, in input order.
#[derive(Clone, Debug)]
pub struct ExperimentRefSet {
    pub references: Vec<Image>,
}

/// Mean of frames `[0, onset_frame)`, truncated to u16.
pub fn reference_from_stack(stack: &Stack, onset_frame: usize) -> Result<Image> {
    let n = stack.frame_count();
    if onset_frame == 0 || onset_frame > n {
        return Err(MocoError::InvalidRange {
            onset: onset_frame,
            frame_count: n,
        });
    }
    Ok(mean_over_time(stack.head(onset_frame)))
}

/// Mean over every frame of the stack.
pub fn temporal_mean(stack: &Stack) -> Result<Image> {
    reference_from_stack(stack, stack.frame_count())
}

/// Reference for a stack on disk.
///
/// Uses the temporal mean of the stack's background-bspline artifact when one
/// exists. Otherwise averages the raw stack up to `onset_frame`, or over all
/// frames when `onset_frame` is `None`.
pub fn reference_from_source(source: &StackSource, onset_frame: Option<usize>) -> Result<Image> {
    if let Some(prior) = source.background_bspline.as_deref().filter(|p| p.is_file()) {
        debug!(artifact = %prior.display(), "Reference from background-bspline artifact");
        return temporal_mean(&read_stack(prior)?);
    }
    let stack = read_stack(&source.path)?;
    match onset_frame {
        Some(onset) => reference_from_stack(&stack, onset),
        None => temporal_mean(&stack),
    }
}

/// Build the per-sibling reference set. All references must share one shape.
pub fn build_ref_set(
    sources: &[StackSource],
    onset_frame: Option<usize>,
) -> Result<ExperimentRefSet> {
    let mut references: Vec<Image> = Vec::with_capacity(sources.len());
    for source in sources {
        let reference = reference_from_source(source, onset_frame)?;
        if let Some(first) = references.first() {
            if first.dim() != reference.dim() {
                return Err(MocoError::DimensionMismatch {
                    expected: first.dim(),
                    actual: reference.dim(),
                });
            }
        }
        references.push(reference);
    }
    Ok(ExperimentRefSet { references })
}

/// Pick (`First`) or average (`Global`) the experiment's references.
pub fn global_reference(ref_set: &ExperimentRefSet, mode: ReferenceMode) -> Result<Image> {
    let first = ref_set.references.first().ok_or(MocoError::EmptySequence)?;
    match mode {
        ReferenceMode::First => Ok(first.clone()),
        ReferenceMode::Global => {
            let (h, w) = first.dim();
            let mut acc = Array2::<f64>::zeros((h, w));
            for reference in &ref_set.references {
                if reference.dim() != (h, w) {
                    return Err(MocoError::DimensionMismatch {
                        expected: (h, w),
                        actual: reference.dim(),
                    });
                }
                acc.zip_mut_with(reference, |a, &v| *a += v as f64);
            }
            let n = ref_set.references.len() as f64;
            Ok(acc.mapv(|v| (v / n) as u16))
        }
    }
}

fn mean_over_time(frames: ArrayView3<'_, u16>) -> Image {
    let n = frames.len_of(Axis(0)) as f64;
    let (_, h, w) = frames.dim();
    let mut acc = Array2::<f64>::zeros((h, w));
    for frame in frames.outer_iter() {
        acc.zip_mut_with(&frame, |a, &v| *a += v as f64);
    }
    acc.mapv(|v| (v / n) as u16)
}
