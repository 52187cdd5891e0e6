use std::borrow::Cow;

use glam::{Affine2, Mat2, Vec2};

use crate::geometry::{Density, LayoutDirection, Rect, Size};
use crate::shape::Outline;
use crate::style::{BlendMode, Color};
use crate::view::effect::{EdgeTreatment, is_effective};
use crate::view::layer::GraphicsLayer;
use crate::view::pixmap::{Pixel, Pixmap};
use crate::view::software;

/// How [`Canvas::mask_outline`] combines an outline with what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Keep only the pixels inside the outline.
    Intersect,
    /// Erase the pixels inside the outline.
    Subtract,
}

/// The active draw target. Coordinates are local px mapped to the target through the
/// current transform.
pub struct Canvas<'a> {
    target: &'a mut Pixmap,
    transform: Affine2,
    clip: Option<Rect>,
    density: Density,
    layout_direction: LayoutDirection,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut Pixmap) -> Self {
        Self::with_environment(target, Density::ONE, LayoutDirection::Ltr)
    }

    pub fn with_environment(
        target: &'a mut Pixmap,
        density: Density,
        layout_direction: LayoutDirection,
    ) -> Self {
        Self {
            target,
            transform: Affine2::IDENTITY,
            clip: None,
            density,
            layout_direction,
        }
    }

    pub fn density(&self) -> Density {
        self.density
    }

    pub fn layout_direction(&self) -> LayoutDirection {
        self.layout_direction
    }

    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    pub fn clip(&self) -> Option<Rect> {
        self.clip
    }

    pub fn target(&self) -> &Pixmap {
        self.target
    }

    pub fn size(&self) -> Size {
        Size::new(self.target.width() as f32, self.target.height() as f32)
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.transform = self.transform * Affine2::from_translation(offset);
    }

    pub fn with_transform<R>(&mut self, transform: Affine2, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.transform;
        self.transform = saved * transform;
        let out = f(self);
        self.transform = saved;
        out
    }

    /// Restricts drawing to `rect` (local coordinates) for the duration of `f`.
    pub fn with_clip<R>(&mut self, rect: Rect, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.clip;
        let device = rect.transformed_bounds(&self.transform);
        let clip = match saved {
            Some(current) => current.intersect(&device).unwrap_or_default(),
            None => device,
        };
        self.clip = Some(clip);
        let out = f(self);
        self.clip = saved;
        out
    }

    pub fn clear(&mut self, color: Color) {
        let pixel = color.to_premultiplied();
        let Some(region) = self.device_region(None) else {
            return;
        };
        for_each_pixel(region, |x, y| self.target.set(x, y, pixel));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color, blend_mode: BlendMode) {
        self.fill_outline(&Outline::Rectangle(rect), color, blend_mode);
    }

    pub fn fill_outline(&mut self, outline: &Outline, color: Color, blend_mode: BlendMode) {
        let src = color.to_premultiplied();
        self.paint(Some(outline.bounds().inflate(1.0)), blend_mode, |p| {
            (src, outline.coverage(p))
        });
    }

    /// Fills everything outside `outline`.
    pub fn fill_outline_inverse(&mut self, outline: &Outline, color: Color, blend_mode: BlendMode) {
        let src = color.to_premultiplied();
        self.paint(None, blend_mode, |p| (src, 1.0 - outline.coverage(p)));
    }

    /// Strokes a band of `width` lying just inside the boundary.
    pub fn stroke_outline_inside(
        &mut self,
        outline: &Outline,
        width: f32,
        color: Color,
        blend_mode: BlendMode,
    ) {
        if !is_effective(width) {
            return;
        }
        let src = color.to_premultiplied();
        self.paint(Some(outline.bounds().inflate(1.0)), blend_mode, |p| {
            (src, outline.inner_stroke_coverage(p, width))
        });
    }

    pub fn mask_outline(&mut self, outline: &Outline, mode: MaskMode) {
        let blend_mode = match mode {
            MaskMode::Intersect => BlendMode::DstIn,
            MaskMode::Subtract => BlendMode::DstOut,
        };
        let Some(inverse) = self.inverse() else {
            return;
        };
        let Some(region) = self.device_region(None) else {
            return;
        };
        for_each_pixel(region, |x, y| {
            let p = inverse.transform_point2(pixel_center(x, y));
            let src = [0.0, 0.0, 0.0, outline.coverage(p)];
            let dst = self.target.get(x, y);
            self.target.set(x, y, blend_mode.blend(src, dst));
        });
    }

    /// Draws `pixmap` with its top-left corner at `offset`.
    pub fn draw_pixmap(
        &mut self,
        pixmap: &Pixmap,
        offset: Vec2,
        alpha: f32,
        blend_mode: BlendMode,
    ) {
        if pixmap.is_empty() || !is_effective(alpha) {
            return;
        }
        let bounds = Rect::from_origin_size(
            offset,
            Size::new(pixmap.width() as f32, pixmap.height() as f32),
        );
        let origin = self.transform.transform_point2(offset);
        if self.transform.matrix2 == Mat2::IDENTITY && origin == origin.round() {
            // Integer translation: copy texels without resampling.
            let Some(region) = self.device_region(Some(bounds)) else {
                return;
            };
            let (ox, oy) = (origin.x as i64, origin.y as i64);
            for_each_pixel(region, |x, y| {
                let src = scale(pixmap.get(x - ox, y - oy), alpha);
                self.blend_pixel(x, y, src, 1.0, blend_mode);
            });
            return;
        }
        self.paint(Some(bounds), blend_mode, |p| {
            (scale(pixmap.sample(p - offset, EdgeTreatment::Decal), alpha), 1.0)
        });
    }

    /// Applies the layer's effect, clips it to its outline and composites it with its
    /// transform, alpha and blend mode.
    pub fn draw_layer(&mut self, layer: &GraphicsLayer) {
        if layer.pixmap().is_empty() {
            return;
        }
        let mut content = match layer.render_effect() {
            Some(effect) => Cow::Owned(software::apply_effect(effect, layer.pixmap())),
            None => Cow::Borrowed(layer.pixmap()),
        };
        if let Some(outline) = layer.clip() {
            Canvas::new(content.to_mut()).mask_outline(outline, MaskMode::Intersect);
        }
        let transform = layer.transform();
        let placement =
            Affine2::from_translation(layer.offset()) * transform.to_affine(layer.size());
        let alpha = layer.alpha() * transform.alpha;
        let blend_mode = layer.blend_mode();
        self.with_transform(placement, |canvas| {
            canvas.draw_pixmap(&content, Vec2::ZERO, alpha, blend_mode);
        });
    }

    fn inverse(&self) -> Option<Affine2> {
        if self.transform.matrix2.determinant().abs() < 1e-6 {
            return None;
        }
        Some(self.transform.inverse())
    }

    /// Target pixels touched by `local_bounds` (or the whole target), clipped.
    fn device_region(&self, local_bounds: Option<Rect>) -> Option<Rect> {
        let mut region = Rect::from_size(self.size());
        if let Some(bounds) = local_bounds {
            region = region.intersect(&bounds.transformed_bounds(&self.transform))?;
        }
        if let Some(clip) = self.clip {
            region = region.intersect(&clip)?;
        }
        Some(region)
    }

    fn paint(
        &mut self,
        local_bounds: Option<Rect>,
        blend_mode: BlendMode,
        shade: impl Fn(Vec2) -> (Pixel, f32),
    ) {
        let Some(inverse) = self.inverse() else {
            return;
        };
        let Some(region) = self.device_region(local_bounds) else {
            return;
        };
        for_each_pixel(region, |x, y| {
            let (src, coverage) = shade(inverse.transform_point2(pixel_center(x, y)));
            self.blend_pixel(x, y, src, coverage, blend_mode);
        });
    }

    fn blend_pixel(&mut self, x: i64, y: i64, src: Pixel, coverage: f32, blend_mode: BlendMode) {
        if coverage <= 0.0 {
            return;
        }
        if blend_mode == BlendMode::SrcOver && src[3] <= 0.0 && src[..3].iter().all(|c| *c <= 0.0) {
            return;
        }
        let dst = self.target.get(x, y);
        let blended = blend_mode.blend(src, dst);
        let out = if coverage >= 1.0 {
            blended
        } else {
            let mut out = [0.0; 4];
            for i in 0..4 {
                out[i] = dst[i] + (blended[i] - dst[i]) * coverage;
            }
            out
        };
        self.target.set(x, y, out);
    }
}

fn pixel_center(x: i64, y: i64) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

fn scale(pixel: Pixel, alpha: f32) -> Pixel {
    if alpha >= 1.0 {
        return pixel;
    }
    pixel.map(|c| c * alpha)
}

// Visits every pixel whose center lies inside `region`.
fn for_each_pixel(region: Rect, mut f: impl FnMut(i64, i64)) {
    let x0 = (region.left - 0.5).ceil() as i64;
    let y0 = (region.top - 0.5).ceil() as i64;
    let x1 = (region.right - 0.5).ceil() as i64;
    let y1 = (region.bottom - 0.5).ceil() as i64;
    for y in y0..y1 {
        for x in x0..x1 {
            f(x, y);
        }
    }
}
