use glam::Vec2;

use crate::geometry::Rect;

const QUAD_SEGMENTS: usize = 16;
const CUBIC_SEGMENTS: usize = 24;
const OVAL_SEGMENTS: usize = 64;
const ARC_SEGMENTS: usize = 12;

/// A set of closed polygons, flattened from the builder's curves. Filled with the
/// even-odd rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    contours: Vec<Vec<Vec2>>,
}

impl Path {
    pub fn builder() -> PathBuilder {
        PathBuilder::default()
    }

    pub fn rect(rect: Rect) -> Self {
        let mut builder = PathBuilder::default();
        builder.add_rect(rect);
        builder.build()
    }

    pub fn oval(rect: Rect) -> Self {
        let mut builder = PathBuilder::default();
        builder.add_oval(rect);
        builder.build()
    }

    pub fn contours(&self) -> &[Vec<Vec2>] {
        &self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        let mut points = self.contours.iter().flatten();
        let Some(first) = points.next() else {
            return Rect::default();
        };
        let (min, max) = points.fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Rect::new(min.x, min.y, max.x, max.y)
    }

    pub fn translate(&self, offset: Vec2) -> Path {
        Path {
            contours: self
                .contours
                .iter()
                .map(|contour| contour.iter().map(|p| *p + offset).collect())
                .collect(),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        let mut inside = false;
        for contour in &self.contours {
            let n = contour.len();
            for i in 0..n {
                let a = contour[i];
                let b = contour[(i + 1) % n];
                if (a.y > p.y) != (b.y > p.y) {
                    let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                    if p.x < x {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }

    pub fn distance(&self, p: Vec2) -> f32 {
        let mut best = f32::INFINITY;
        for contour in &self.contours {
            let n = contour.len();
            for i in 0..n {
                best = best.min(segment_distance(p, contour[i], contour[(i + 1) % n]));
            }
        }
        best
    }

    pub fn signed_distance(&self, p: Vec2) -> f32 {
        if self.contours.is_empty() {
            return f32::INFINITY;
        }
        let d = self.distance(p);
        if self.contains(p) { -d } else { d }
    }
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[derive(Debug, Default)]
pub struct PathBuilder {
    contours: Vec<Vec<Vec2>>,
    current: Vec<Vec2>,
}

impl PathBuilder {
    pub fn move_to(&mut self, p: Vec2) -> &mut Self {
        self.flush();
        self.current.push(p);
        self
    }

    pub fn line_to(&mut self, p: Vec2) -> &mut Self {
        self.current.push(p);
        self
    }

    pub fn quad_to(&mut self, control: Vec2, p: Vec2) -> &mut Self {
        let start = self.last_point();
        for i in 1..=QUAD_SEGMENTS {
            let t = i as f32 / QUAD_SEGMENTS as f32;
            let mt = 1.0 - t;
            self.current
                .push(start * (mt * mt) + control * (2.0 * mt * t) + p * (t * t));
        }
        self
    }

    pub fn cubic_to(&mut self, c1: Vec2, c2: Vec2, p: Vec2) -> &mut Self {
        let start = self.last_point();
        for i in 1..=CUBIC_SEGMENTS {
            let t = i as f32 / CUBIC_SEGMENTS as f32;
            let mt = 1.0 - t;
            self.current.push(
                start * (mt * mt * mt)
                    + c1 * (3.0 * mt * mt * t)
                    + c2 * (3.0 * mt * t * t)
                    + p * (t * t * t),
            );
        }
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.flush();
        self
    }

    pub fn add_rect(&mut self, rect: Rect) -> &mut Self {
        self.move_to(Vec2::new(rect.left, rect.top))
            .line_to(Vec2::new(rect.right, rect.top))
            .line_to(Vec2::new(rect.right, rect.bottom))
            .line_to(Vec2::new(rect.left, rect.bottom))
            .close()
    }

    pub fn add_oval(&mut self, rect: Rect) -> &mut Self {
        let center = rect.center();
        let radii = rect.size().to_vec2() * 0.5;
        self.flush();
        for i in 0..OVAL_SEGMENTS {
            let angle = i as f32 / OVAL_SEGMENTS as f32 * std::f32::consts::TAU;
            self.current
                .push(center + Vec2::new(angle.cos(), angle.sin()) * radii);
        }
        self.close()
    }

    /// Rounded rectangle with radii ordered top-left, top-right, bottom-right, bottom-left.
    pub fn add_rounded_rect(&mut self, rect: Rect, radii: [f32; 4]) -> &mut Self {
        use std::f32::consts::{FRAC_PI_2, PI};
        let rounded = super::RoundedRect::new(rect, radii);
        let [tl, tr, br, bl] = rounded.radii;
        self.flush();
        self.append_arc(Vec2::new(rect.right - tr, rect.top + tr), tr, -FRAC_PI_2, 0.0);
        self.append_arc(Vec2::new(rect.right - br, rect.bottom - br), br, 0.0, FRAC_PI_2);
        self.append_arc(Vec2::new(rect.left + bl, rect.bottom - bl), bl, FRAC_PI_2, PI);
        self.append_arc(Vec2::new(rect.left + tl, rect.top + tl), tl, PI, PI * 1.5);
        self.close()
    }

    fn append_arc(&mut self, center: Vec2, radius: f32, start: f32, end: f32) {
        if radius <= 0.0 {
            self.current.push(center);
            return;
        }
        for i in 0..=ARC_SEGMENTS {
            let t = i as f32 / ARC_SEGMENTS as f32;
            let a = start + (end - start) * t;
            self.current
                .push(center + Vec2::new(a.cos(), a.sin()) * radius);
        }
    }

    fn last_point(&self) -> Vec2 {
        self.current
            .last()
            .copied()
            .or_else(|| self.contours.last().and_then(|c| c.first().copied()))
            .unwrap_or(Vec2::ZERO)
    }

    fn flush(&mut self) {
        let contour = std::mem::take(&mut self.current);
        if contour.len() >= 3 {
            self.contours.push(contour);
        }
    }

    pub fn build(&mut self) -> Path {
        self.flush();
        Path {
            contours: std::mem::take(&mut self.contours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_path_matches_rect_distance() {
        let path = Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(path.contains(Vec2::new(5.0, 5.0)));
        assert!(!path.contains(Vec2::new(15.0, 5.0)));
        assert!((path.signed_distance(Vec2::new(5.0, 5.0)) + 5.0).abs() < 1e-5);
        assert!((path.signed_distance(Vec2::new(13.0, 5.0)) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn nested_contours_use_even_odd() {
        let mut builder = Path::builder();
        builder
            .add_rect(Rect::new(0.0, 0.0, 30.0, 30.0))
            .add_rect(Rect::new(10.0, 10.0, 20.0, 20.0));
        let ring = builder.build();
        assert!(ring.contains(Vec2::new(5.0, 5.0)));
        assert!(!ring.contains(Vec2::new(15.0, 15.0)));
    }

    #[test]
    fn oval_bounds_match_rect() {
        let oval = Path::oval(Rect::new(2.0, 4.0, 22.0, 14.0));
        let bounds = oval.bounds();
        assert!((bounds.left - 2.0).abs() < 1e-4);
        assert!((bounds.right - 22.0).abs() < 1e-4);
        assert!((bounds.top - 4.0).abs() < 0.1);
        assert!((bounds.bottom - 14.0).abs() < 0.1);
    }

    #[test]
    fn degenerate_contours_are_dropped() {
        let mut builder = Path::builder();
        builder.move_to(Vec2::ZERO).line_to(Vec2::ONE).close();
        assert!(builder.build().is_empty());
    }
}
