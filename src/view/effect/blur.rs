use super::{Capabilities, EdgeTreatment, EffectKind, EffectScope, is_effective};
use crate::geometry::Dp;

/// Upper bound on taps per side of one blur direction.
pub const MAX_KERNEL_RADIUS: u32 = 96;

/// Gaussian sigma for a blur radius in px.
pub fn blur_sigma(radius: f32) -> f32 {
    0.57735 * radius + 0.5
}

/// Taps per side needed to cover three standard deviations.
pub fn kernel_radius(sigma: f32) -> u32 {
    ((sigma * 3.0).ceil().max(0.0) as u32).min(MAX_KERNEL_RADIUS)
}

impl EffectScope {
    pub fn blur(&mut self, radius: Dp) -> &mut Self {
        self.blur_with(radius, EdgeTreatment::Clamp)
    }

    pub fn blur_with(&mut self, radius: Dp, edge: EdgeTreatment) -> &mut Self {
        let radius = radius.to_px(self.density());
        if !is_effective(radius) {
            return self;
        }
        self.push(EffectKind::Blur { radius, edge }, Capabilities::RENDER_EFFECTS)
    }
}
