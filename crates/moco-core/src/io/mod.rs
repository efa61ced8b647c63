pub mod image_io;
pub mod mhd;
pub mod tiff_stack;

pub use image_io::{load_image, save_image};
pub use tiff_stack::{read_stack, write_stack};
