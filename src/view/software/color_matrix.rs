use crate::view::effect::ColorMatrix;
use crate::view::pixmap::Pixmap;

/// Applies `matrix` to unpremultiplied color and premultiplies the result.
pub fn color_matrix(source: &Pixmap, matrix: &ColorMatrix) -> Pixmap {
    let mut out = source.clone();
    for pixel in out.pixels_mut() {
        let a = pixel[3];
        let straight = if a > 0.0 {
            [pixel[0] / a, pixel[1] / a, pixel[2] / a, a]
        } else {
            [0.0; 4]
        };
        let [r, g, b, a] = matrix.apply(straight);
        *pixel = [r * a, g * a, b * a, a];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn opacity_matrix_scales_premultiplied_pixels() {
        let source = Pixmap::filled(1, 1, Color::WHITE);
        let out = color_matrix(&source, &ColorMatrix::opacity(0.5));
        assert_eq!(out.get(0, 0), [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn brightness_lifts_color_but_not_empty_alpha() {
        let mut source = Pixmap::new(2, 1);
        source.set(0, 0, [0.0, 0.0, 0.0, 1.0]);
        let out = color_matrix(&source, &ColorMatrix::color_controls(0.25, 1.0, 1.0));
        assert!((out.get(0, 0)[0] - 0.25).abs() < 1e-6);
        assert_eq!(out.get(1, 0), [0.0; 4]);
    }
}
