use glam::Vec2;

use super::Path;
use crate::geometry::Rect;

/// Concrete boundary of a shape at a given size.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Rectangle(Rect),
    Rounded(RoundedRect),
    Generic(Path),
}

/// A rectangle with circular corners, radii ordered top-left, top-right,
/// bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub rect: Rect,
    pub radii: [f32; 4],
}

impl RoundedRect {
    /// Builds a rounded rect, scaling radii down so adjacent corners never overlap.
    pub fn new(rect: Rect, radii: [f32; 4]) -> Self {
        let [tl, tr, br, bl] = radii.map(|r| r.max(0.0));
        let width = rect.width().max(0.0);
        let height = rect.height().max(0.0);
        let mut scale = 1.0f32;
        for (sum, side) in [
            (tl + tr, width),
            (bl + br, width),
            (tl + bl, height),
            (tr + br, height),
        ] {
            if sum > side && sum > 0.0 {
                scale = scale.min(side / sum);
            }
        }
        Self {
            rect,
            radii: [tl * scale, tr * scale, br * scale, bl * scale],
        }
    }

    pub fn signed_distance(&self, p: Vec2) -> f32 {
        let half = self.rect.size().to_vec2() * 0.5;
        sd_rounded_rect(p - self.rect.center(), half, self.radii)
    }
}

impl Outline {
    pub fn bounds(&self) -> Rect {
        match self {
            Outline::Rectangle(rect) => *rect,
            Outline::Rounded(rounded) => rounded.rect,
            Outline::Generic(path) => path.bounds(),
        }
    }

    /// Corner radii when the outline is representable as a rounded rectangle.
    pub fn corner_radii(&self) -> Option<[f32; 4]> {
        match self {
            Outline::Rectangle(_) => Some([0.0; 4]),
            Outline::Rounded(rounded) => Some(rounded.radii),
            Outline::Generic(_) => None,
        }
    }

    /// Negative inside, positive outside, in outline units.
    pub fn signed_distance(&self, p: Vec2) -> f32 {
        match self {
            Outline::Rectangle(rect) => {
                sd_rounded_rect(p - rect.center(), rect.size().to_vec2() * 0.5, [0.0; 4])
            }
            Outline::Rounded(rounded) => rounded.signed_distance(p),
            Outline::Generic(path) => path.signed_distance(p),
        }
    }

    /// Anti-aliased coverage of the pixel centered at `p`.
    pub fn coverage(&self, p: Vec2) -> f32 {
        (0.5 - self.signed_distance(p)).clamp(0.0, 1.0)
    }

    /// Coverage of a stroke of `width` lying just inside the boundary.
    pub fn inner_stroke_coverage(&self, p: Vec2, width: f32) -> f32 {
        let half = width * 0.5;
        let distance = (self.signed_distance(p) + half).abs() - half;
        (0.5 - distance).clamp(0.0, 1.0)
    }

    pub fn translate(&self, offset: Vec2) -> Outline {
        match self {
            Outline::Rectangle(rect) => Outline::Rectangle(rect.translate(offset)),
            Outline::Rounded(rounded) => Outline::Rounded(RoundedRect {
                rect: rounded.rect.translate(offset),
                radii: rounded.radii,
            }),
            Outline::Generic(path) => Outline::Generic(path.translate(offset)),
        }
    }
}

fn corner_radius(p: Vec2, radii: [f32; 4]) -> f32 {
    match (p.x < 0.0, p.y > 0.0) {
        (true, false) => radii[0],
        (false, false) => radii[1],
        (false, true) => radii[2],
        (true, true) => radii[3],
    }
}

/// Signed distance from `p` (relative to the center) to a rounded rectangle.
pub fn sd_rounded_rect(p: Vec2, half_size: Vec2, radii: [f32; 4]) -> f32 {
    let r = corner_radius(p, radii);
    let q = p.abs() - half_size + Vec2::splat(r);
    q.x.max(q.y).min(0.0) + q.max(Vec2::ZERO).length() - r
}

/// Outward unit normal of the nearest rounded-rect edge.
pub fn grad_sd_rounded_rect(p: Vec2, half_size: Vec2, radii: [f32; 4]) -> Vec2 {
    let r = corner_radius(p, radii);
    let q = p.abs() - half_size + Vec2::splat(r);
    let g = if q.x > 0.0 && q.y > 0.0 {
        q.normalize()
    } else if q.x > q.y {
        Vec2::X
    } else {
        Vec2::Y
    };
    Vec2::new(
        if p.x >= 0.0 { g.x } else { -g.x },
        if p.y >= 0.0 { g.y } else { -g.y },
    )
}

/// Circular easing: 0 at `x = 0`, 1 at `x = 1`, steepest near 1.
pub fn circle_map(x: f32) -> f32 {
    1.0 - (1.0 - x * x).max(0.0).sqrt()
}
