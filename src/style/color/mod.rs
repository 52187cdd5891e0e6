use once_cell::sync::Lazy;

mod hex_color;

pub use hex_color::*;

/// An sRGB color with straight (unpremultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn hex(raw: &str) -> HexColor<'_> {
        HexColor::new(raw)
    }

    pub const fn alpha_u8(self) -> u8 {
        self.a
    }

    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }

    pub const fn with_alpha_u8(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        self.with_alpha_u8((alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub const fn is_fully_transparent(self) -> bool {
        self.a == 0
    }

    /// Straight linear RGBA.
    pub fn to_linear(self) -> [f32; 4] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
            self.alpha(),
        ]
    }

    /// Premultiplied linear RGBA, the pixel format of every [`crate::Pixmap`].
    pub fn to_premultiplied(self) -> [f32; 4] {
        let [r, g, b, a] = self.to_linear();
        [r * a, g * a, b * a, a]
    }

    pub fn from_linear(rgba: [f32; 4]) -> Self {
        Self::rgba(
            (linear_to_srgb_f32(rgba[0].clamp(0.0, 1.0)) * 255.0).round() as u8,
            (linear_to_srgb_f32(rgba[1].clamp(0.0, 1.0)) * 255.0).round() as u8,
            (linear_to_srgb_f32(rgba[2].clamp(0.0, 1.0)) * 255.0).round() as u8,
            (rgba[3].clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }

    pub fn from_premultiplied(rgba: [f32; 4]) -> Self {
        let a = rgba[3];
        if a <= 0.0 {
            return Self::TRANSPARENT;
        }
        Self::from_linear([rgba[0] / a, rgba[1] / a, rgba[2] / a, a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

pub trait IntoColor<T> {
    fn into_color(self) -> T;
}

impl IntoColor<Color> for &str {
    fn into_color(self) -> Color {
        Color::hex(self).to_color()
    }
}

impl IntoColor<Color> for String {
    fn into_color(self) -> Color {
        self.as_str().into_color()
    }
}

impl IntoColor<Color> for Color {
    fn into_color(self) -> Color {
        self
    }
}

static SRGB8_TO_LINEAR: Lazy<[f32; 256]> = Lazy::new(|| {
    let mut t = [0.0f32; 256];
    for (i, slot) in t.iter_mut().enumerate() {
        *slot = srgb_to_linear_f32(i as f32 / 255.0);
    }
    t
});

pub fn srgb_to_linear(c: u8) -> f32 {
    SRGB8_TO_LINEAR[c as usize]
}

pub fn srgb_to_linear_f32(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb_f32(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}
