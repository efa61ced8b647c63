use std::path::Path;

use image::{ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2};

use crate::error::{MocoError, Result};
use crate::stack::Image;

/// Save a 2-D image as 16-bit grayscale TIFF (format follows the extension).
pub fn save_image(image: ArrayView2<'_, u16>, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let pixels: Vec<u16> = image.iter().copied().collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| MocoError::Pipeline(format!("buffer does not fit {w}x{h}")))?;
    img.save(path)?;
    Ok(())
}

/// Load a grayscale image file as 16-bit samples.
pub fn load_image(path: &Path) -> Result<Image> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
        .map_err(|e| MocoError::Pipeline(format!("{}: {e}", path.display())))?;
    Ok(data)
}
