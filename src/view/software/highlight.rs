use glam::Vec2;

use crate::shape::grad_sd_rounded_rect;
use crate::view::effect::HighlightParams;
use crate::view::pixmap::Pixmap;

/// Scales each pixel by how directly the nearest edge faces the light direction.
pub fn highlight(source: &Pixmap, params: &HighlightParams) -> Pixmap {
    let mut out = source.clone();
    let half_size = params.size.to_vec2() * 0.5;
    let angle = params.angle_degrees.to_radians();
    let light = Vec2::new(angle.cos(), angle.sin());
    let falloff = params.falloff.max(0.01);
    for y in 0..source.height() as i64 {
        for x in 0..source.width() as i64 {
            let coord = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let normal = grad_sd_rounded_rect(coord - half_size, half_size, params.corner_radii);
            let intensity = normal.dot(light).abs().powf(falloff);
            let pixel = source.get(x, y);
            out.set(x, y, pixel.map(|c| c * intensity));
        }
    }
    out
}
