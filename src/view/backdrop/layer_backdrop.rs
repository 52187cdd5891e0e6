use std::cell::RefCell;
use std::fmt;

use glam::Vec2;

use super::Backdrop;
use crate::geometry::{Density, LayoutCoordinates, LayoutDirection};
use crate::style::{BlendMode, Color};
use crate::view::canvas::Canvas;
use crate::view::layer::{GraphicsLayer, LayerAllocator};

/// Lifecycle of a [`LayerBackdrop`]. There is no way back from `Detached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackdropPhase {
    Unattached,
    Attached,
    Positioned,
    Detached,
}

enum Inner {
    Unattached,
    Attached(GraphicsLayer),
    Positioned {
        layer: GraphicsLayer,
        coordinates: LayoutCoordinates,
    },
    Detached,
}

/// A backdrop backed by a captured offscreen layer.
pub struct LayerBackdrop {
    background: Option<Color>,
    inner: RefCell<Inner>,
}

impl LayerBackdrop {
    pub fn new(background: Option<Color>) -> Self {
        Self {
            background,
            inner: RefCell::new(Inner::Unattached),
        }
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    pub fn phase(&self) -> BackdropPhase {
        match &*self.inner.borrow() {
            Inner::Unattached => BackdropPhase::Unattached,
            Inner::Attached(_) => BackdropPhase::Attached,
            Inner::Positioned { .. } => BackdropPhase::Positioned,
            Inner::Detached => BackdropPhase::Detached,
        }
    }

    /// Acquires the capture layer. Returns `false` if the backdrop is already attached
    /// or was detached before.
    pub fn attach(&self, allocator: &LayerAllocator) -> bool {
        let mut inner = self.inner.borrow_mut();
        match &*inner {
            Inner::Unattached => {
                *inner = Inner::Attached(allocator.acquire());
                true
            }
            Inner::Detached => {
                tracing::warn!("detached backdrop cannot be attached again");
                false
            }
            Inner::Attached(_) | Inner::Positioned { .. } => false,
        }
    }

    /// Records where the captured content sits on screen. Ignored unless attached.
    pub fn position(&self, coordinates: LayoutCoordinates) {
        let mut inner = self.inner.borrow_mut();
        let layer = match std::mem::replace(&mut *inner, Inner::Unattached) {
            Inner::Attached(layer) | Inner::Positioned { layer, .. } => layer,
            other => {
                *inner = other;
                return;
            }
        };
        *inner = Inner::Positioned { layer, coordinates };
    }

    pub fn coordinates(&self) -> Option<LayoutCoordinates> {
        match &*self.inner.borrow() {
            Inner::Positioned { coordinates, .. } => Some(*coordinates),
            _ => None,
        }
    }

    /// Re-records the capture layer at the positioned size, over the background.
    /// Returns `false` when the backdrop has no layer or no position yet.
    pub fn record(
        &self,
        density: Density,
        layout_direction: LayoutDirection,
        draw: impl FnOnce(&mut Canvas<'_>),
    ) -> bool {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            tracing::warn!("backdrop is already being recorded or drawn");
            return false;
        };
        let Inner::Positioned { layer, coordinates } = &mut *inner else {
            return false;
        };
        let background = self.background;
        layer.record(coordinates.size, density, layout_direction, |canvas| {
            if let Some(color) = background {
                canvas.clear(color);
            }
            draw(canvas);
        });
        true
    }

    /// Draws the captured content with its top-left corner at the canvas origin.
    pub fn draw_captured(&self, canvas: &mut Canvas<'_>) -> bool {
        let Ok(inner) = self.inner.try_borrow() else {
            return false;
        };
        match &*inner {
            Inner::Positioned { layer, .. } => {
                canvas.draw_pixmap(layer.pixmap(), Vec2::ZERO, 1.0, BlendMode::SrcOver);
                true
            }
            _ => false,
        }
    }

    /// Releases the capture layer. Further draws are no-ops.
    pub fn detach(&self) {
        *self.inner.borrow_mut() = Inner::Detached;
    }
}

impl Backdrop for LayerBackdrop {
    fn is_coordinates_dependent(&self) -> bool {
        true
    }

    fn draw_backdrop(&self, canvas: &mut Canvas<'_>, caller: Option<&LayoutCoordinates>) {
        let Some(caller) = caller else {
            return;
        };
        // Recording a surface that samples its own capture is a cycle; skip it.
        let Ok(inner) = self.inner.try_borrow() else {
            tracing::warn!("backdrop drawn while it is being recorded");
            return;
        };
        let Inner::Positioned { layer, coordinates } = &*inner else {
            return;
        };
        let Some(transform) = coordinates.transform_to(caller) else {
            return;
        };
        canvas.with_transform(transform, |canvas| {
            canvas.draw_pixmap(layer.pixmap(), Vec2::ZERO, 1.0, BlendMode::SrcOver);
        });
    }
}

impl Default for LayerBackdrop {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for LayerBackdrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerBackdrop")
            .field("background", &self.background)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Size};
    use crate::view::pixmap::Pixmap;

    fn paint_halves(canvas: &mut Canvas<'_>) {
        let left = Rect::new(0.0, 0.0, 4.0, 8.0);
        let right = Rect::new(4.0, 0.0, 8.0, 8.0);
        canvas.fill_rect(left, Color::rgb(200, 30, 90), BlendMode::SrcOver);
        canvas.fill_rect(right, Color::rgba(10, 180, 40, 77), BlendMode::SrcOver);
    }

    fn captured(allocator: &LayerAllocator, position: Vec2) -> LayerBackdrop {
        let backdrop = LayerBackdrop::new(None);
        assert!(backdrop.attach(allocator));
        backdrop.position(LayoutCoordinates::at(position, Size::new(8.0, 8.0)));
        backdrop.record(Density::ONE, LayoutDirection::Ltr, paint_halves);
        backdrop
    }

    #[test]
    fn unpositioned_backdrop_draws_nothing() {
        let allocator = LayerAllocator::new();
        let backdrop = LayerBackdrop::new(Some(Color::WHITE));
        backdrop.attach(&allocator);
        assert_eq!(backdrop.phase(), BackdropPhase::Attached);
        assert!(!backdrop.record(Density::ONE, LayoutDirection::Ltr, |c| c.clear(Color::BLACK)));
        let caller = LayoutCoordinates::at(Vec2::ZERO, Size::new(8.0, 8.0));
        let mut target = Pixmap::new(8, 8);
        backdrop.draw_backdrop(&mut Canvas::new(&mut target), Some(&caller));
        backdrop.draw_backdrop(&mut Canvas::new(&mut target), Some(&caller));
        assert_eq!(target, Pixmap::new(8, 8));
    }

    #[test]
    fn capture_round_trip_is_pixel_exact() {
        let allocator = LayerAllocator::new();
        let backdrop = captured(&allocator, Vec2::new(5.0, 7.0));
        let mut original = Pixmap::new(8, 8);
        paint_halves(&mut Canvas::new(&mut original));
        let caller = LayoutCoordinates::at(Vec2::new(5.0, 7.0), Size::new(8.0, 8.0));
        let mut target = Pixmap::new(8, 8);
        backdrop.draw_backdrop(&mut Canvas::new(&mut target), Some(&caller));
        assert_eq!(target, original);
        assert_eq!(target.to_rgba_image(), original.to_rgba_image());
    }

    #[test]
    fn content_aligns_under_the_caller() {
        let allocator = LayerAllocator::new();
        let backdrop = captured(&allocator, Vec2::ZERO);
        let caller = LayoutCoordinates::at(Vec2::new(2.0, 1.0), Size::new(4.0, 4.0));
        let mut target = Pixmap::new(4, 4);
        backdrop.draw_backdrop(&mut Canvas::new(&mut target), Some(&caller));
        assert_eq!(target.get(0, 0), Color::rgb(200, 30, 90).to_premultiplied());
        assert_eq!(target.get(2, 0), Color::rgba(10, 180, 40, 77).to_premultiplied());
    }

    #[test]
    fn detach_releases_and_refuses_reattach() {
        let allocator = LayerAllocator::new();
        let backdrop = captured(&allocator, Vec2::ZERO);
        assert_eq!(allocator.live(), 1);
        backdrop.detach();
        assert_eq!(backdrop.phase(), BackdropPhase::Detached);
        assert_eq!(allocator.live(), 0);
        assert!(!backdrop.attach(&allocator));
        assert_eq!(allocator.acquired(), 1);
        assert_eq!(allocator.released(), 1);

        let caller = LayoutCoordinates::at(Vec2::ZERO, Size::new(8.0, 8.0));
        let mut target = Pixmap::new(8, 8);
        backdrop.draw_backdrop(&mut Canvas::new(&mut target), Some(&caller));
        assert_eq!(target, Pixmap::new(8, 8));
    }
}
