use glam::{Affine2, Mat2, Vec2};

use super::Size;

/// Placement of a node as reported by the host's global-position callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCoordinates {
    pub size: Size,
    pub local_to_root: Affine2,
}

impl LayoutCoordinates {
    pub fn new(size: Size, local_to_root: Affine2) -> Self {
        Self {
            size,
            local_to_root,
        }
    }

    /// An untransformed node whose top-left corner sits at `position` in the root.
    pub fn at(position: Vec2, size: Size) -> Self {
        Self::new(size, Affine2::from_translation(position))
    }

    pub fn position_in_root(&self) -> Vec2 {
        self.local_to_root.translation
    }

    pub fn is_translation_only(&self) -> bool {
        self.local_to_root.matrix2 == Mat2::IDENTITY
    }

    pub fn root_to_local(&self) -> Option<Affine2> {
        if self.is_translation_only() {
            return Some(Affine2::from_translation(-self.local_to_root.translation));
        }
        if self.local_to_root.matrix2.determinant().abs() < 1e-6 {
            return None;
        }
        Some(self.local_to_root.inverse())
    }

    /// Maps points in this node's local space into `other`'s local space.
    pub fn transform_to(&self, other: &LayoutCoordinates) -> Option<Affine2> {
        if self.is_translation_only() && other.is_translation_only() {
            return Some(Affine2::from_translation(
                self.position_in_root() - other.position_in_root(),
            ));
        }
        Some(other.root_to_local()? * self.local_to_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_only_transform_is_position_delta() {
        let backdrop = LayoutCoordinates::at(Vec2::ZERO, Size::new(200.0, 200.0));
        let caller = LayoutCoordinates::at(Vec2::new(30.0, 40.0), Size::new(50.0, 50.0));
        let transform = backdrop.transform_to(&caller).unwrap();
        assert_eq!(transform, Affine2::from_translation(Vec2::new(-30.0, -40.0)));
    }

    #[test]
    fn scaled_caller_maps_root_points_back_into_local_space() {
        let backdrop = LayoutCoordinates::at(Vec2::ZERO, Size::new(200.0, 200.0));
        let caller = LayoutCoordinates::new(
            Size::new(50.0, 50.0),
            Affine2::from_translation(Vec2::new(10.0, 10.0))
                * Affine2::from_scale(Vec2::splat(2.0)),
        );
        let transform = backdrop.transform_to(&caller).unwrap();
        let local = transform.transform_point2(Vec2::new(30.0, 50.0));
        assert!(local.abs_diff_eq(Vec2::new(10.0, 20.0), 1e-5));
    }

    #[test]
    fn collapsed_caller_has_no_local_space() {
        let caller = LayoutCoordinates::new(
            Size::new(10.0, 10.0),
            Affine2::from_scale(Vec2::new(0.0, 1.0)),
        );
        assert!(caller.root_to_local().is_none());
    }
}
