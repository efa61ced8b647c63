use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::GAUSSIAN_TRUNCATE;

/// Minimum pixel count (h*w) to justify row-level parallelism.
const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Separable Gaussian blur with mirrored ("reflect") borders.
///
/// The kernel extends `floor(GAUSSIAN_TRUNCATE * sigma + 0.5)` pixels on each
/// side. `sigma <= 0` returns the input unchanged.
pub fn gaussian_blur_array(data: ArrayView2<'_, f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return data.to_owned();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Direction::Rows);
    convolve(row_pass.view(), &kernel, Direction::Cols)
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Half-sample symmetric index: `d c b a | a b c d | d c b a`.
fn reflect(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * len;
    let m = i.rem_euclid(period);
    (if m < len { m } else { period - 1 - m }) as usize
}

#[derive(Clone, Copy)]
enum Direction {
    Rows,
    Cols,
}

fn convolve(data: ArrayView2<'_, f32>, kernel: &[f32], dir: Direction) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;

    let sample = |row: usize, col: usize| -> f32 {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let off = ki as isize - radius;
            let v = match dir {
                Direction::Rows => data[[row, reflect(col as isize + off, w)]],
                Direction::Cols => data[[reflect(row as isize + off, h), col]],
            };
            sum += v * kv;
        }
        sum
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let values: Vec<f32> = (0..h)
            .into_par_iter()
            .flat_map_iter(|row| (0..w).map(move |col| (row, col)))
            .map(|(row, col)| sample(row, col))
            .collect();
        Array2::from_shape_vec((h, w), values).expect("buffer size matches dimensions")
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| sample(row, col))
    }
}
