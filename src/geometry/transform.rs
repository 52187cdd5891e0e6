use glam::{Affine2, Mat2, Vec2};

use super::Size;

const SINGULAR_EPSILON: f32 = 1e-6;

/// Transform a glass surface applies to its own layer after layout, e.g. a press
/// animation scaling the surface around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation_degrees: f32,
    pub translation: Vec2,
    /// Pivot as a fraction of the layer size.
    pub pivot: Vec2,
    pub alpha: f32,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LayerTransform {
    pub const IDENTITY: LayerTransform = LayerTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        rotation_degrees: 0.0,
        translation: Vec2::ZERO,
        pivot: Vec2::new(0.5, 0.5),
        alpha: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        self.scale_x == 1.0
            && self.scale_y == 1.0
            && self.rotation_degrees == 0.0
            && self.translation == Vec2::ZERO
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation_degrees % 360.0 != 0.0
    }

    fn pivot_px(&self, size: Size) -> Vec2 {
        self.pivot * size.to_vec2()
    }

    /// Maps layer-local points to the parent's coordinate space.
    pub fn to_affine(&self, size: Size) -> Affine2 {
        if self.is_identity() {
            return Affine2::IDENTITY;
        }
        let pivot = self.pivot_px(size);
        Affine2::from_translation(self.translation + pivot)
            * Affine2::from_angle(self.rotation_degrees.to_radians())
            * Affine2::from_scale(Vec2::new(self.scale_x, self.scale_y))
            * Affine2::from_translation(-pivot)
    }

    /// Maps parent points back into layer space, or `None` for a degenerate scale.
    ///
    /// Without rotation the reciprocal-scale shortcut is used; it agrees with
    /// [`LayerTransform::general_inverse`], which stays the reference for every
    /// other composition.
    pub fn inverse_affine(&self, size: Size) -> Option<Affine2> {
        if self.is_identity() {
            return Some(Affine2::IDENTITY);
        }
        if self.has_rotation() {
            self.general_inverse(size)
        } else {
            self.reciprocal_scale_inverse(size)
        }
    }

    pub fn general_inverse(&self, size: Size) -> Option<Affine2> {
        let forward = self.to_affine(size);
        if forward.matrix2.determinant().abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(forward.inverse())
    }

    pub fn reciprocal_scale_inverse(&self, size: Size) -> Option<Affine2> {
        if self.scale_x.abs() < SINGULAR_EPSILON || self.scale_y.abs() < SINGULAR_EPSILON {
            return None;
        }
        let pivot = self.pivot_px(size);
        let inverse_scale = Affine2 {
            matrix2: Mat2::from_diagonal(Vec2::new(1.0 / self.scale_x, 1.0 / self.scale_y)),
            translation: Vec2::ZERO,
        };
        Some(
            Affine2::from_translation(pivot)
                * inverse_scale
                * Affine2::from_translation(-(pivot + self.translation)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_affine_eq(a: Affine2, b: Affine2) {
        assert!(a.abs_diff_eq(b, 1e-4), "{a:?} != {b:?}");
    }

    #[test]
    fn identity_has_identity_inverse() {
        let size = Size::new(40.0, 20.0);
        assert_eq!(LayerTransform::IDENTITY.to_affine(size), Affine2::IDENTITY);
        assert_eq!(
            LayerTransform::IDENTITY.inverse_affine(size),
            Some(Affine2::IDENTITY)
        );
    }

    #[test]
    fn reciprocal_scale_agrees_with_matrix_inverse_without_rotation() {
        let size = Size::new(120.0, 48.0);
        let transform = LayerTransform {
            scale_x: 1.25,
            scale_y: 0.8,
            translation: Vec2::new(6.0, -3.0),
            ..LayerTransform::IDENTITY
        };
        let general = transform.general_inverse(size).unwrap();
        let shortcut = transform.reciprocal_scale_inverse(size).unwrap();
        assert_affine_eq(general, shortcut);
        assert_affine_eq(transform.inverse_affine(size).unwrap(), general);
    }

    #[test]
    fn rotated_inverse_undoes_forward_transform() {
        let size = Size::new(64.0, 64.0);
        let transform = LayerTransform {
            scale_x: 1.5,
            scale_y: 0.5,
            rotation_degrees: 30.0,
            translation: Vec2::new(2.0, 4.0),
            ..LayerTransform::IDENTITY
        };
        let forward = transform.to_affine(size);
        let inverse = transform.inverse_affine(size).unwrap();
        for p in [Vec2::ZERO, Vec2::new(64.0, 0.0), Vec2::new(17.0, 45.0)] {
            let back = inverse.transform_point2(forward.transform_point2(p));
            assert!(back.abs_diff_eq(p, 1e-3), "{back:?} != {p:?}");
        }
    }

    #[test]
    fn pivot_stays_fixed_under_scale() {
        let size = Size::new(100.0, 50.0);
        let transform = LayerTransform {
            scale_x: 2.0,
            scale_y: 2.0,
            ..LayerTransform::IDENTITY
        };
        let center = Vec2::new(50.0, 25.0);
        assert!(transform.to_affine(size).transform_point2(center).abs_diff_eq(center, 1e-5));
    }

    #[test]
    fn zero_scale_has_no_inverse() {
        let transform = LayerTransform {
            scale_x: 0.0,
            ..LayerTransform::IDENTITY
        };
        assert!(transform.inverse_affine(Size::new(10.0, 10.0)).is_none());
    }
}
