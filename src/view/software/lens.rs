use glam::Vec2;

use crate::shape::{circle_map, grad_sd_rounded_rect, sd_rounded_rect};
use crate::view::effect::{EdgeTreatment, LensParams, is_effective};
use crate::view::pixmap::{Pixel, Pixmap};

const DISPERSION_TAPS: usize = 7;

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn channel_mask(t: f32) -> Pixel {
    let r = 1.0 - smoothstep(-1.0, 0.0, t);
    let g = 1.0 - smoothstep(0.0, 1.0, t.abs());
    let b = smoothstep(0.0, 1.0, t);
    [r, g, b, g]
}

fn safe_normalize(v: Vec2) -> Vec2 {
    v.try_normalize().unwrap_or(Vec2::ZERO)
}

/// Refracts (and optionally disperses) samples inside a band along the edge of a
/// rounded rectangle covering the whole source.
pub fn lens(source: &Pixmap, params: &LensParams) -> Pixmap {
    let mut out = source.clone();
    if !is_effective(params.height) {
        return out;
    }
    let half_size = params.size.to_vec2() * 0.5;
    let grad_limit = half_size.x.min(half_size.y);
    let grad_radii = params.corner_radii.map(|r| (r * 1.5).min(grad_limit));

    for y in 0..source.height() as i64 {
        for x in 0..source.width() as i64 {
            let coord = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let centered = coord - half_size;
            let sd = sd_rounded_rect(centered, half_size, params.corner_radii);
            if -sd >= params.height {
                continue;
            }
            let d = circle_map(1.0 - (-sd).max(0.0) / params.height);
            let mut normal = grad_sd_rounded_rect(centered, half_size, grad_radii);
            if params.depth_effect {
                normal = safe_normalize(normal + safe_normalize(centered));
            }
            let refracted = coord - normal * d * params.amount;

            let pixel = if params.dispersion <= 0.0 {
                source.sample(refracted, EdgeTreatment::Clamp)
            } else {
                let tangent = Vec2::new(-normal.y, normal.x);
                let mut color = [0.0; 4];
                let mut weight = [0.0; 4];
                for i in 0..DISPERSION_TAPS {
                    let t = i as f32 / 3.0 - 1.0;
                    let mask = channel_mask(t);
                    let tap = source.sample(
                        refracted + tangent * (t * d * params.dispersion),
                        EdgeTreatment::Clamp,
                    );
                    for c in 0..4 {
                        color[c] += tap[c] * mask[c];
                        weight[c] += mask[c];
                    }
                }
                std::array::from_fn(|c| color[c] / weight[c].max(1e-5))
            };
            out.set(x, y, pixel);
        }
    }
    out
}
