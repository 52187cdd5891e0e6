use super::{Capabilities, EffectKind, EffectScope, LensParams, is_effective};
use crate::geometry::Dp;

/// Dispersion applied by [`EffectScope::lens`] with chromatic aberration, relative to
/// the refraction amount.
pub const CHROMATIC_ABERRATION_RATIO: f32 = 0.5;

impl EffectScope {
    /// Bends the backdrop inside a band of `height` along the edge, displacing samples by
    /// up to `amount`.
    pub fn refraction(&mut self, height: Dp, amount: Dp, depth_effect: bool) -> &mut Self {
        let height = height.to_px(self.density());
        let amount = amount.to_px(self.density());
        if !is_effective(amount) {
            return self;
        }
        self.push_lens(height, amount, depth_effect, 0.0)
    }

    /// Splits color channels along the edge tangent inside a band of `height`.
    pub fn dispersion(&mut self, height: Dp, amount: Dp) -> &mut Self {
        let height = height.to_px(self.density());
        let amount = amount.to_px(self.density());
        if !is_effective(amount) {
            return self;
        }
        self.push_lens(height, 0.0, false, amount)
    }

    pub fn lens(
        &mut self,
        height: Dp,
        amount: Dp,
        depth_effect: bool,
        chromatic_aberration: bool,
    ) -> &mut Self {
        let height = height.to_px(self.density());
        let amount = amount.to_px(self.density());
        if !is_effective(amount) {
            return self;
        }
        let dispersion = if chromatic_aberration {
            amount * CHROMATIC_ABERRATION_RATIO
        } else {
            0.0
        };
        self.push_lens(height, amount, depth_effect, dispersion)
    }

    fn push_lens(
        &mut self,
        height: f32,
        amount: f32,
        depth_effect: bool,
        dispersion: f32,
    ) -> &mut Self {
        if !is_effective(height) {
            return self;
        }
        let Some(corner_radii) = self.outline().corner_radii() else {
            tracing::debug!("lens skipped, outline is not a rounded rectangle");
            return self;
        };
        let params = LensParams {
            size: self.size(),
            corner_radii,
            height,
            amount,
            depth_effect,
            dispersion,
        };
        self.push(EffectKind::Lens(params), Capabilities::RUNTIME_SHADERS)
    }
}
