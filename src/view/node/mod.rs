//! Attachment points a host drives through attach, position, update, draw and detach.

mod capture;
mod decorator;
mod glass;

pub use capture::*;
pub use decorator::*;
pub use glass::*;
