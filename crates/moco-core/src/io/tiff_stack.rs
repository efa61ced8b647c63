use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tracing::debug;

use crate::error::{MocoError, Result};
use crate::stack::{Image, Stack};

/// Read a multi-page grayscale TIFF; each page is one frame.
///
/// 8-bit pages are widened to u16. Every page must share the first page's
/// dimensions.
pub fn read_stack(path: &Path) -> Result<Stack> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let mut frames: Vec<Image> = Vec::new();

    loop {
        let (w, h) = decoder.dimensions()?;
        let samples: Vec<u16> = match decoder.read_image()? {
            DecodingResult::U16(buf) => buf,
            DecodingResult::U8(buf) => buf.into_iter().map(u16::from).collect(),
            _ => {
                return Err(MocoError::UnsupportedSampleFormat(format!(
                    "{}: page {} is not 8/16-bit unsigned",
                    path.display(),
                    frames.len()
                )))
            }
        };
        if samples.len() != w as usize * h as usize {
            return Err(MocoError::UnsupportedSampleFormat(format!(
                "{}: page {} is not single-channel",
                path.display(),
                frames.len()
            )));
        }
        let frame = Array2::from_shape_vec((h as usize, w as usize), samples)
            .map_err(|e| MocoError::Pipeline(e.to_string()))?;
        frames.push(frame);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let stack = Stack::from_frames(frames)?;
    debug!(
        path = %path.display(),
        frames = stack.frame_count(),
        height = stack.height(),
        width = stack.width(),
        "Read stack"
    );
    Ok(stack)
}

/// Write a stack as a multi-page 16-bit grayscale TIFF.
pub fn write_stack(stack: &Stack, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let (h, w) = stack.frame_dim();

    for frame in stack.frames() {
        let pixels: Vec<u16> = frame.iter().copied().collect();
        encoder.write_image::<colortype::Gray16>(w as u32, h as u32, &pixels)?;
    }
    debug!(path = %path.display(), frames = stack.frame_count(), "Wrote stack");
    Ok(())
}
