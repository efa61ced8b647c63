pub mod align;
pub mod config;
pub mod correct;
pub mod engine;
pub mod two_color;
