use super::{Capabilities, ColorMatrix, EffectKind, EffectScope};

impl EffectScope {
    /// Brightness offset, contrast around mid-gray and saturation. Identity values
    /// (0, 1, 1) add nothing.
    pub fn color_controls(&mut self, brightness: f32, contrast: f32, saturation: f32) -> &mut Self {
        if brightness == 0.0 && contrast == 1.0 && saturation == 1.0 {
            return self;
        }
        if !(brightness.is_finite() && contrast.is_finite() && saturation.is_finite()) {
            return self;
        }
        self.color_filter(ColorMatrix::color_controls(brightness, contrast, saturation))
    }

    pub fn vibrancy(&mut self) -> &mut Self {
        self.color_controls(0.0, 1.0, 1.5)
    }

    pub fn opacity(&mut self, alpha: f32) -> &mut Self {
        if alpha >= 1.0 || alpha.is_nan() {
            return self;
        }
        self.color_filter(ColorMatrix::opacity(alpha.max(0.0)))
    }

    pub fn color_filter(&mut self, matrix: ColorMatrix) -> &mut Self {
        if matrix.is_identity() || matrix.0.iter().any(|value| !value.is_finite()) {
            return self;
        }
        self.push(EffectKind::ColorMatrix(matrix), Capabilities::RENDER_EFFECTS)
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::Size;
    use crate::shape::Shape;
    use crate::view::effect::scope::tests::scope_for;
    use crate::view::effect::{ColorMatrix, EffectKind, GlassConfig};

    #[test]
    fn identity_adjustments_add_nothing() {
        let mut scope = scope_for(Shape::Rectangle, Size::new(10.0, 10.0), GlassConfig::default());
        scope
            .color_controls(0.0, 1.0, 1.0)
            .opacity(1.0)
            .opacity(1.5)
            .color_filter(ColorMatrix::IDENTITY);
        assert!(scope.render_effect().is_none());
    }

    #[test]
    fn non_finite_adjustments_add_nothing() {
        let mut scope = scope_for(Shape::Rectangle, Size::new(10.0, 10.0), GlassConfig::default());
        let mut poisoned = ColorMatrix::IDENTITY;
        poisoned.0[4] = f32::NAN;
        scope
            .color_controls(f32::NAN, 1.0, 1.0)
            .color_controls(0.0, 1.0, f32::INFINITY)
            .opacity(f32::NAN)
            .color_filter(poisoned);
        assert!(scope.render_effect().is_none());
    }

    #[test]
    fn vibrancy_boosts_saturation() {
        let mut scope = scope_for(Shape::Rectangle, Size::new(10.0, 10.0), GlassConfig::default());
        scope.vibrancy();
        let effect = scope.into_effect().unwrap();
        assert_eq!(
            effect.passes()[0].kind,
            EffectKind::ColorMatrix(ColorMatrix::saturation(1.5))
        );
    }

    #[test]
    fn opacity_scales_alpha_row() {
        let mut scope = scope_for(Shape::Rectangle, Size::new(10.0, 10.0), GlassConfig::default());
        scope.opacity(0.25);
        let effect = scope.into_effect().unwrap();
        let EffectKind::ColorMatrix(matrix) = effect.passes()[0].kind else {
            panic!("expected a color matrix");
        };
        assert_eq!(matrix.apply([0.5, 0.5, 0.5, 1.0])[3], 0.25);
    }
}
