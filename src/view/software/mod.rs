//! CPU reference kernels for every effect pass.

mod blur;
mod color_matrix;
mod highlight;
mod lens;

pub use blur::gaussian_blur;
pub use color_matrix::color_matrix;
pub use highlight::highlight;
pub use lens::lens;

use crate::view::effect::{EffectKind, RenderEffect};
use crate::view::pixmap::Pixmap;

/// Runs every pass of `effect` over `source`, inner passes first.
pub fn apply_effect(effect: &RenderEffect, source: &Pixmap) -> Pixmap {
    let mut current = source.clone();
    for pass in effect.passes() {
        current = apply_pass(&pass.kind, &current);
    }
    current
}

pub fn apply_pass(kind: &EffectKind, source: &Pixmap) -> Pixmap {
    match kind {
        EffectKind::Blur { radius, edge } => gaussian_blur(source, *radius, *edge),
        EffectKind::ColorMatrix(matrix) => color_matrix(source, matrix),
        EffectKind::Lens(params) => lens(source, params),
        EffectKind::Highlight(params) => highlight(source, params),
    }
}
