mod blend_mode;
mod color;

pub use blend_mode::*;
pub use color::*;
