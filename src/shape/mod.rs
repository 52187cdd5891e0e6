mod outline;
mod outline_cache;
mod path;

pub use outline::*;
pub use outline_cache::*;
pub use path::*;

use std::fmt;
use std::rc::Rc;

use crate::geometry::{Density, Dp, LayoutDirection, Rect, Size};

/// A shape re-evaluated every frame; the resolved [`Shape`] keys the outline cache.
pub type ShapeProvider = Rc<dyn Fn() -> Shape>;

/// Abstract shape descriptor, resolved into an [`Outline`] once size, layout direction
/// and density are known.
#[derive(Clone)]
pub enum Shape {
    Rectangle,
    RoundedCorner(RoundedCornerShape),
    /// Fully rounded corners: a circle for square sizes, a capsule otherwise.
    Circle,
    Generic(GenericShape),
}

impl Shape {
    pub fn rounded(corner: CornerSize) -> Self {
        Shape::RoundedCorner(RoundedCornerShape::all(corner))
    }

    pub fn rounded_dp(radius: f32) -> Self {
        Self::rounded(CornerSize::Dp(Dp(radius)))
    }

    pub fn generic(build: impl Fn(Size, LayoutDirection, Density) -> Path + 'static) -> Self {
        Shape::Generic(GenericShape(Rc::new(build)))
    }

    pub fn into_provider(self) -> ShapeProvider {
        Rc::new(move || self.clone())
    }

    pub fn create_outline(
        &self,
        size: Size,
        layout_direction: LayoutDirection,
        density: Density,
    ) -> Outline {
        let bounds = Rect::from_size(size);
        match self {
            Shape::Rectangle => Outline::Rectangle(bounds),
            Shape::RoundedCorner(shape) => shape.create_outline(size, layout_direction, density),
            Shape::Circle => RoundedCornerShape::all(CornerSize::Percent(50.0))
                .create_outline(size, layout_direction, density),
            Shape::Generic(shape) => Outline::Generic((shape.0)(size, layout_direction, density)),
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Shape::Rectangle, Shape::Rectangle) => true,
            (Shape::Circle, Shape::Circle) => true,
            (Shape::RoundedCorner(a), Shape::RoundedCorner(b)) => a == b,
            (Shape::Generic(a), Shape::Generic(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Rectangle => f.write_str("Rectangle"),
            Shape::RoundedCorner(shape) => f.debug_tuple("RoundedCorner").field(shape).finish(),
            Shape::Circle => f.write_str("Circle"),
            Shape::Generic(_) => f.write_str("Generic"),
        }
    }
}

#[derive(Clone)]
pub struct GenericShape(pub Rc<dyn Fn(Size, LayoutDirection, Density) -> Path>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerSize {
    Px(f32),
    Dp(Dp),
    /// Percentage of the shorter side.
    Percent(f32),
}

impl CornerSize {
    pub fn to_px(self, size: Size, density: Density) -> f32 {
        let px = match self {
            CornerSize::Px(px) => px,
            CornerSize::Dp(dp) => dp.to_px(density),
            CornerSize::Percent(percent) => size.min_dimension() * percent / 100.0,
        };
        px.max(0.0)
    }
}

/// Per-corner radii expressed relative to the reading direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedCornerShape {
    pub top_start: CornerSize,
    pub top_end: CornerSize,
    pub bottom_end: CornerSize,
    pub bottom_start: CornerSize,
}

impl RoundedCornerShape {
    pub fn all(corner: CornerSize) -> Self {
        Self {
            top_start: corner,
            top_end: corner,
            bottom_end: corner,
            bottom_start: corner,
        }
    }

    pub fn create_outline(
        &self,
        size: Size,
        layout_direction: LayoutDirection,
        density: Density,
    ) -> Outline {
        let top_start = self.top_start.to_px(size, density);
        let top_end = self.top_end.to_px(size, density);
        let bottom_end = self.bottom_end.to_px(size, density);
        let bottom_start = self.bottom_start.to_px(size, density);
        let radii = match layout_direction {
            LayoutDirection::Ltr => [top_start, top_end, bottom_end, bottom_start],
            LayoutDirection::Rtl => [top_end, top_start, bottom_start, bottom_end],
        };
        let bounds = Rect::from_size(size);
        if radii.iter().all(|r| *r <= 0.0) {
            return Outline::Rectangle(bounds);
        }
        Outline::Rounded(RoundedRect::new(bounds, radii))
    }
}
