use crate::view::effect::{EdgeTreatment, blur_sigma, is_effective, kernel_radius};
use crate::view::pixmap::{Pixel, Pixmap};

fn gaussian_kernel(radius: f32) -> Vec<f32> {
    let sigma = blur_sigma(radius);
    let half = kernel_radius(sigma) as i64;
    let mut weights: Vec<f32> = (-half..=half)
        .map(|i| {
            let x = i as f32;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Separable Gaussian blur, horizontal then vertical.
pub fn gaussian_blur(source: &Pixmap, radius: f32, edge: EdgeTreatment) -> Pixmap {
    if !is_effective(radius) || source.is_empty() {
        return source.clone();
    }
    let kernel = gaussian_kernel(radius);
    let horizontal = convolve(source, &kernel, edge, (1, 0));
    convolve(&horizontal, &kernel, edge, (0, 1))
}

fn convolve(source: &Pixmap, kernel: &[f32], edge: EdgeTreatment, (dx, dy): (i64, i64)) -> Pixmap {
    let half = (kernel.len() / 2) as i64;
    let (width, height) = (source.width() as i64, source.height() as i64);
    let mut out = Pixmap::new(source.width(), source.height());
    for y in 0..height {
        for x in 0..width {
            let mut acc: Pixel = [0.0; 4];
            for (k, weight) in kernel.iter().enumerate() {
                let offset = k as i64 - half;
                let (sx, sy) = (x + dx * offset, y + dy * offset);
                let texel = match edge {
                    EdgeTreatment::Clamp => {
                        source.get(sx.clamp(0, width - 1), sy.clamp(0, height - 1))
                    }
                    EdgeTreatment::Decal => source.get(sx, sy),
                };
                for c in 0..4 {
                    acc[c] += texel[c] * weight;
                }
            }
            out.set(x, y, acc);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(6.0);
        let total: f32 = kernel.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(kernel.first(), kernel.last());
    }

    #[test]
    fn clamped_blur_preserves_flat_color() {
        let source = Pixmap::filled(6, 4, Color::rgb(40, 120, 200));
        let blurred = gaussian_blur(&source, 4.0, EdgeTreatment::Clamp);
        for (a, b) in blurred.pixels().iter().zip(source.pixels()) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn decal_blur_fades_edges_and_spreads_points() {
        let flat = Pixmap::filled(8, 8, Color::WHITE);
        let faded = gaussian_blur(&flat, 3.0, EdgeTreatment::Decal);
        assert!(faded.get(0, 0)[3] < faded.get(4, 4)[3]);

        let mut point = Pixmap::new(9, 9);
        point.set(4, 4, [1.0; 4]);
        let spread = gaussian_blur(&point, 2.0, EdgeTreatment::Decal);
        assert!(spread.get(4, 4)[3] < 1.0);
        assert!(spread.get(5, 4)[3] > 0.0);
    }
}
