use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::style::{Color, linear_to_srgb_f32, srgb_to_linear};
use crate::view::effect::EdgeTreatment;

pub type Pixel = [f32; 4];

const TRANSPARENT: Pixel = [0.0; 4];

/// CPU render target holding premultiplied linear RGBA.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pixmap {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let mut pixmap = Self::new(width, height);
        pixmap.fill(color.to_premultiplied());
        pixmap
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    pub fn fill(&mut self, pixel: Pixel) {
        self.pixels.fill(pixel);
    }

    /// Reallocates to `width` x `height` and clears to transparent.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, TRANSPARENT);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Transparent outside the bounds.
    pub fn get(&self, x: i64, y: i64) -> Pixel {
        self.index(x, y)
            .map(|i| self.pixels[i])
            .unwrap_or(TRANSPARENT)
    }

    pub fn set(&mut self, x: i64, y: i64, pixel: Pixel) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = pixel;
        }
    }

    fn fetch(&self, x: i64, y: i64, edge: EdgeTreatment) -> Pixel {
        match edge {
            EdgeTreatment::Decal => self.get(x, y),
            EdgeTreatment::Clamp => {
                if self.is_empty() {
                    return TRANSPARENT;
                }
                let x = x.clamp(0, self.width as i64 - 1);
                let y = y.clamp(0, self.height as i64 - 1);
                self.get(x, y)
            }
        }
    }

    /// Bilinear sample at `p` in pixel units, where pixel centers sit at `i + 0.5`.
    pub fn sample(&self, p: Vec2, edge: EdgeTreatment) -> Pixel {
        let x = p.x - 0.5;
        let y = p.y - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);
        let a = self.fetch(xi, yi, edge);
        let b = self.fetch(xi + 1, yi, edge);
        let c = self.fetch(xi, yi + 1, edge);
        let d = self.fetch(xi + 1, yi + 1, edge);
        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let mut pixmap = Self::new(image.width(), image.height());
        for (dst, src) in pixmap.pixels.iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = Color::rgba(r, g, b, a).to_premultiplied();
        }
        pixmap
    }

    /// Unpremultiplied sRGB.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (dst, src) in image.pixels_mut().zip(self.pixels.iter()) {
            *dst = Rgba(Color::from_premultiplied(*src).to_rgba_u8());
        }
        image
    }

    /// Bytes for an `Rgba8UnormSrgb` texture: premultiplied linear color with each
    /// color channel sRGB-encoded, so filtered reads return premultiplied linear values.
    pub fn to_upload_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            for channel in &pixel[..3] {
                bytes.push(quantize(linear_to_srgb_f32(*channel)));
            }
            bytes.push(quantize(pixel[3]));
        }
        bytes
    }

    /// Inverse of [`Pixmap::to_upload_bytes`], used for readback.
    pub fn from_upload_bytes(width: u32, height: u32, bytes: &[u8]) -> Self {
        let mut pixmap = Self::new(width, height);
        for (dst, src) in pixmap.pixels.iter_mut().zip(bytes.chunks_exact(4)) {
            *dst = [
                srgb_to_linear(src[0]),
                srgb_to_linear(src[1]),
                srgb_to_linear(src[2]),
                src[3] as f32 / 255.0,
            ];
        }
        pixmap
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_round_trip_is_lossless_for_opaque_pixels() {
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, Rgba([12, 200, 99, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(2, 0, Rgba([255, 128, 1, 255]));
        let pixmap = Pixmap::from_rgba_image(&image);
        assert_eq!(pixmap.to_rgba_image(), image);
    }

    #[test]
    fn sampling_at_pixel_centers_is_exact() {
        let mut pixmap = Pixmap::new(2, 2);
        pixmap.set(1, 0, [0.5, 0.25, 0.0, 1.0]);
        assert_eq!(pixmap.sample(Vec2::new(1.5, 0.5), EdgeTreatment::Clamp), [0.5, 0.25, 0.0, 1.0]);
    }

    #[test]
    fn decal_sampling_fades_past_the_edge() {
        let pixmap = Pixmap::filled(2, 2, Color::WHITE);
        let inside = pixmap.sample(Vec2::new(1.0, 1.0), EdgeTreatment::Decal);
        let edge = pixmap.sample(Vec2::new(2.0, 1.0), EdgeTreatment::Decal);
        let clamped = pixmap.sample(Vec2::new(2.0, 1.0), EdgeTreatment::Clamp);
        assert_eq!(inside[3], 1.0);
        assert_eq!(edge[3], 0.5);
        assert_eq!(clamped[3], 1.0);
    }

    #[test]
    fn upload_bytes_encode_premultiplied_color() {
        let pixmap = Pixmap::filled(1, 1, Color::rgba(255, 255, 255, 0));
        assert_eq!(pixmap.to_upload_bytes(), vec![0, 0, 0, 0]);
        let opaque = Pixmap::filled(1, 1, Color::rgb(10, 20, 30));
        assert_eq!(opaque.to_upload_bytes(), vec![10, 20, 30, 255]);
        assert_eq!(
            Pixmap::from_upload_bytes(1, 1, &opaque.to_upload_bytes()).to_rgba_image(),
            opaque.to_rgba_image()
        );
    }
}
