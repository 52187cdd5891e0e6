mod coordinates;
mod rect;
mod transform;
mod units;

pub use coordinates::*;
pub use rect::*;
pub use transform::*;
pub use units::*;

pub use glam::{Affine2, Vec2};
