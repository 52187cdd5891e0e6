use std::rc::Rc;

use glam::Vec2;

use crate::geometry::{Density, Dp, LayoutDirection, Size};
use crate::shape::Outline;
use crate::style::{BlendMode, Color, IntoColor};
use crate::view::canvas::{Canvas, MaskMode};
use crate::view::effect::{
    Capabilities, EdgeTreatment, EffectKind, GlassConfig, HighlightParams, RenderEffect,
    blur_sigma, is_effective, kernel_radius,
};
use crate::view::layer::{GraphicsLayer, LayerAllocator};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HighlightStyle {
    /// A uniform stroke.
    Flat,
    /// Stroke intensity follows how directly each edge faces a light at `angle`
    /// degrees. `falloff` sharpens the transition.
    Dynamic { angle: f32, falloff: f32 },
}

impl Default for HighlightStyle {
    fn default() -> Self {
        HighlightStyle::Dynamic {
            angle: 45.0,
            falloff: 1.0,
        }
    }
}

/// A thin specular stroke just inside the outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub width: Dp,
    pub color: Color,
    pub blend_mode: BlendMode,
    pub style: HighlightStyle,
}

impl Highlight {
    /// A stroke of constant intensity. `color` accepts a [`Color`] or a hex literal.
    pub fn flat(width: Dp, color: impl IntoColor<Color>) -> Self {
        Self {
            width,
            color: color.into_color(),
            blend_mode: BlendMode::Plus,
            style: HighlightStyle::Flat,
        }
    }
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            width: Dp(1.0),
            color: Color::WHITE.with_alpha(0.5),
            blend_mode: BlendMode::Plus,
            style: HighlightStyle::default(),
        }
    }
}

/// Drop shadow drawn behind the surface. `offset` is in dp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub radius: Dp,
    pub offset: Vec2,
    pub color: Color,
    pub alpha: f32,
    pub blend_mode: BlendMode,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            radius: Dp(24.0),
            offset: Vec2::new(0.0, 4.0),
            color: Color::BLACK.with_alpha(0.1),
            alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
        }
    }
}

/// Shadow cast inward from the edges, drawn above the backdrop. `offset` is in dp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnerShadow {
    pub radius: Dp,
    pub offset: Vec2,
    pub color: Color,
    pub alpha: f32,
    pub blend_mode: BlendMode,
}

impl Default for InnerShadow {
    fn default() -> Self {
        Self {
            radius: Dp(24.0),
            offset: Vec2::ZERO,
            color: Color::BLACK.with_alpha(0.15),
            alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
        }
    }
}

/// What a decorator renders against.
pub struct DecorationContext<'a> {
    pub size: Size,
    pub density: Density,
    pub layout_direction: LayoutDirection,
    pub outline: &'a Rc<Outline>,
    pub config: &'a GlassConfig,
}

#[derive(PartialEq)]
struct DecorationKey<V> {
    value: V,
    size: Size,
    outline: Outline,
    density: Density,
}

/// An offscreen layer re-rendered only when its key changes.
struct DecorationLayer<V> {
    layer: Option<GraphicsLayer>,
    key: Option<DecorationKey<V>>,
    renders: u64,
}

impl<V: PartialEq> DecorationLayer<V> {
    fn new() -> Self {
        Self {
            layer: None,
            key: None,
            renders: 0,
        }
    }

    fn attach(&mut self, allocator: &LayerAllocator) {
        if self.layer.is_none() {
            self.layer = Some(allocator.acquire());
            self.key = None;
        }
    }

    fn detach(&mut self) {
        self.layer = None;
        self.key = None;
    }

    fn draw(
        &mut self,
        canvas: &mut Canvas<'_>,
        value: V,
        ctx: &DecorationContext<'_>,
        render: impl FnOnce(&mut GraphicsLayer),
    ) {
        let Some(layer) = self.layer.as_mut() else {
            return;
        };
        let key = DecorationKey {
            value,
            size: ctx.size,
            outline: Outline::clone(ctx.outline),
            density: ctx.density,
        };
        if self.key.as_ref() != Some(&key) {
            render(layer);
            self.key = Some(key);
            self.renders += 1;
        }
        canvas.draw_layer(layer);
    }
}

pub struct HighlightDecorator {
    inner: DecorationLayer<Highlight>,
}

impl HighlightDecorator {
    pub fn new() -> Self {
        Self {
            inner: DecorationLayer::new(),
        }
    }

    pub fn attach(&mut self, allocator: &LayerAllocator) {
        self.inner.attach(allocator);
    }

    pub fn detach(&mut self) {
        self.inner.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.inner.layer.is_some()
    }

    pub fn renders(&self) -> u64 {
        self.inner.renders
    }

    pub fn layer(&self) -> Option<&GraphicsLayer> {
        self.inner.layer.as_ref()
    }

    pub fn draw(
        &mut self,
        canvas: &mut Canvas<'_>,
        highlight: Highlight,
        ctx: &DecorationContext<'_>,
    ) {
        let width = highlight.width.to_px(ctx.density);
        if !is_effective(width) || highlight.color.is_fully_transparent() {
            return;
        }
        self.inner.draw(canvas, highlight, ctx, |layer| {
            layer.record(ctx.size, ctx.density, ctx.layout_direction, |canvas| {
                let color = highlight.color;
                canvas.stroke_outline_inside(ctx.outline, width, color, BlendMode::SrcOver);
            });
            if let Some(effect) = dynamic_highlight(highlight.style, ctx) {
                layer.bake_effect(&effect);
            }
            layer.set_blend_mode(highlight.blend_mode);
        });
    }
}

impl Default for HighlightDecorator {
    fn default() -> Self {
        Self::new()
    }
}

// Falls back to the flat stroke when the kernel cannot run on this outline.
fn dynamic_highlight(
    style: HighlightStyle,
    ctx: &DecorationContext<'_>,
) -> Option<RenderEffect> {
    let HighlightStyle::Dynamic { angle, falloff } = style else {
        return None;
    };
    if !angle.is_finite() || !falloff.is_finite() {
        return None;
    }
    let corner_radii = ctx.outline.corner_radii()?;
    let params = HighlightParams {
        size: ctx.size,
        corner_radii,
        angle_degrees: angle,
        falloff,
    };
    ctx.config
        .effect(EffectKind::Highlight(params), Capabilities::RUNTIME_SHADERS)
}

fn blur_effect(radius: f32, edge: EdgeTreatment, config: &GlassConfig) -> Option<RenderEffect> {
    if !is_effective(radius) {
        return None;
    }
    config.effect(EffectKind::Blur { radius, edge }, Capabilities::RENDER_EFFECTS)
}

// Unusable radii draw a hard shadow.
fn effective_radius(radius: Dp, density: Density) -> f32 {
    let radius = radius.to_px(density);
    if is_effective(radius) { radius } else { 0.0 }
}

pub struct ShadowDecorator {
    inner: DecorationLayer<Shadow>,
}

impl ShadowDecorator {
    pub fn new() -> Self {
        Self {
            inner: DecorationLayer::new(),
        }
    }

    pub fn attach(&mut self, allocator: &LayerAllocator) {
        self.inner.attach(allocator);
    }

    pub fn detach(&mut self) {
        self.inner.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.inner.layer.is_some()
    }

    pub fn renders(&self) -> u64 {
        self.inner.renders
    }

    /// Fills the offset outline, blurs it and cuts out the shape interior.
    pub fn draw(&mut self, canvas: &mut Canvas<'_>, shadow: Shadow, ctx: &DecorationContext<'_>) {
        if shadow.color.is_fully_transparent() || !is_effective(shadow.alpha) {
            return;
        }
        let offset = shadow.offset * ctx.density.scale();
        if !offset.is_finite() {
            return;
        }
        let radius = effective_radius(shadow.radius, ctx.density);
        let spread = if radius > 0.0 {
            kernel_radius(blur_sigma(radius)) as f32
        } else {
            0.0
        };
        let pad = (spread + offset.abs().max_element()).ceil() + 1.0;
        let padded = Size::new(ctx.size.width + 2.0 * pad, ctx.size.height + 2.0 * pad);
        self.inner.draw(canvas, shadow, ctx, |layer| {
            let origin = Vec2::splat(pad);
            layer.record(padded, ctx.density, ctx.layout_direction, |canvas| {
                canvas.translate(origin);
                let outline = ctx.outline.translate(offset);
                canvas.fill_outline(&outline, shadow.color, BlendMode::SrcOver);
            });
            if let Some(effect) = blur_effect(radius, EdgeTreatment::Decal, ctx.config) {
                layer.bake_effect(&effect);
            }
            layer.paint(|canvas| {
                canvas.translate(origin);
                canvas.mask_outline(ctx.outline, MaskMode::Subtract);
            });
            layer.set_offset(-origin);
            layer.set_alpha(shadow.alpha);
            layer.set_blend_mode(shadow.blend_mode);
        });
    }
}

impl Default for ShadowDecorator {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerShadowDecorator {
    inner: DecorationLayer<InnerShadow>,
}

impl InnerShadowDecorator {
    pub fn new() -> Self {
        Self {
            inner: DecorationLayer::new(),
        }
    }

    pub fn attach(&mut self, allocator: &LayerAllocator) {
        self.inner.attach(allocator);
    }

    pub fn detach(&mut self) {
        self.inner.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.inner.layer.is_some()
    }

    pub fn renders(&self) -> u64 {
        self.inner.renders
    }

    /// Fills outside the offset outline, blurs it and keeps only the shape interior.
    pub fn draw(
        &mut self,
        canvas: &mut Canvas<'_>,
        shadow: InnerShadow,
        ctx: &DecorationContext<'_>,
    ) {
        if shadow.color.is_fully_transparent() || !is_effective(shadow.alpha) {
            return;
        }
        let offset = shadow.offset * ctx.density.scale();
        if !offset.is_finite() {
            return;
        }
        let radius = effective_radius(shadow.radius, ctx.density);
        self.inner.draw(canvas, shadow, ctx, |layer| {
            layer.record(ctx.size, ctx.density, ctx.layout_direction, |canvas| {
                let outline = ctx.outline.translate(offset);
                canvas.fill_outline_inverse(&outline, shadow.color, BlendMode::SrcOver);
            });
            if let Some(effect) = blur_effect(radius, EdgeTreatment::Clamp, ctx.config) {
                layer.bake_effect(&effect);
            }
            layer.paint(|canvas| canvas.mask_outline(ctx.outline, MaskMode::Intersect));
            layer.set_alpha(shadow.alpha);
            layer.set_blend_mode(shadow.blend_mode);
        });
    }
}

impl Default for InnerShadowDecorator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::view::pixmap::Pixmap;

    fn context<'a>(
        outline: &'a Rc<Outline>,
        size: Size,
        config: &'a GlassConfig,
    ) -> DecorationContext<'a> {
        DecorationContext {
            size,
            density: Density::ONE,
            layout_direction: LayoutDirection::Ltr,
            outline,
            config,
        }
    }

    fn outline(shape: Shape, size: Size) -> Rc<Outline> {
        Rc::new(shape.create_outline(size, LayoutDirection::Ltr, Density::ONE))
    }

    #[test]
    fn highlight_renders_once_per_key() {
        let config = GlassConfig::default();
        let size = Size::new(20.0, 12.0);
        let outline = outline(Shape::rounded_dp(4.0), size);
        let mut decorator = HighlightDecorator::new();
        decorator.attach(&config.layers);
        let mut target = Pixmap::new(20, 12);
        let highlight = Highlight::default();
        let ctx = context(&outline, size, &config);
        for _ in 0..3 {
            decorator.draw(&mut Canvas::new(&mut target), highlight, &ctx);
        }
        assert_eq!(decorator.renders(), 1);

        let wider = Highlight {
            width: Dp(2.0),
            ..highlight
        };
        decorator.draw(&mut Canvas::new(&mut target), wider, &context(&outline, size, &config));
        assert_eq!(decorator.renders(), 2);
    }

    #[test]
    fn zero_width_or_transparent_highlight_is_skipped() {
        let config = GlassConfig::default();
        let size = Size::new(10.0, 10.0);
        let outline = outline(Shape::Rectangle, size);
        let mut decorator = HighlightDecorator::new();
        decorator.attach(&config.layers);
        let mut target = Pixmap::new(10, 10);
        let ctx = context(&outline, size, &config);
        let zero_width = Highlight::flat(Dp(0.0), Color::WHITE);
        let transparent = Highlight::flat(Dp(2.0), Color::TRANSPARENT);
        decorator.draw(&mut Canvas::new(&mut target), zero_width, &ctx);
        decorator.draw(&mut Canvas::new(&mut target), transparent, &ctx);
        assert_eq!(decorator.renders(), 0);
        assert_eq!(target, Pixmap::new(10, 10));
    }

    #[test]
    fn non_finite_parameters_never_reach_the_target() {
        let config = GlassConfig::default();
        let size = Size::new(10.0, 10.0);
        let outline = outline(Shape::rounded_dp(3.0), size);
        let ctx = context(&outline, size, &config);
        let mut target = Pixmap::new(30, 30);

        let mut highlight = HighlightDecorator::new();
        highlight.attach(&config.layers);
        let nan_width = Highlight::flat(Dp(f32::NAN), Color::WHITE);
        highlight.draw(&mut Canvas::new(&mut target), nan_width, &ctx);
        assert_eq!(highlight.renders(), 0);
        assert_eq!(target, Pixmap::new(30, 30));

        let mut shadow = ShadowDecorator::new();
        shadow.attach(&config.layers);
        let nan_alpha = Shadow {
            alpha: f32::NAN,
            ..Shadow::default()
        };
        let nan_offset = Shadow {
            offset: Vec2::new(f32::NAN, 0.0),
            ..Shadow::default()
        };
        for skipped in [nan_alpha, nan_offset] {
            shadow.draw(&mut Canvas::new(&mut target), skipped, &ctx);
        }
        assert_eq!(shadow.renders(), 0);
        assert_eq!(target, Pixmap::new(30, 30));

        let dynamic = Highlight {
            style: HighlightStyle::Dynamic {
                angle: f32::NAN,
                falloff: 1.0,
            },
            ..Highlight::flat(Dp(2.0), Color::WHITE)
        };
        let nan_radius = Shadow {
            radius: Dp(f32::NAN),
            color: Color::BLACK,
            ..Shadow::default()
        };
        {
            let mut canvas = Canvas::new(&mut target);
            canvas.translate(Vec2::new(10.0, 10.0));
            highlight.draw(&mut canvas, dynamic, &ctx);
            shadow.draw(&mut canvas, nan_radius, &ctx);
        }
        assert!(target.pixels().iter().flatten().all(|channel| channel.is_finite()));
        assert!(target.get(15, 10)[3] > 0.0);
    }

    #[test]
    fn dynamic_highlight_falls_back_to_flat() {
        let size = Size::new(16.0, 16.0);
        let render = |shape: Shape, style: HighlightStyle, config: GlassConfig| {
            let outline = outline(shape, size);
            let mut decorator = HighlightDecorator::new();
            decorator.attach(&config.layers);
            let mut target = Pixmap::new(16, 16);
            let highlight = Highlight {
                style,
                ..Highlight::flat(Dp(2.0), "#ffffff")
            };
            let ctx = context(&outline, size, &config);
            decorator.draw(&mut Canvas::new(&mut target), highlight, &ctx);
            target
        };
        let dynamic = HighlightStyle::default();
        let limited =
            GlassConfig::new(Capabilities::OFFSCREEN_LAYERS | Capabilities::RENDER_EFFECTS);
        assert_eq!(
            render(Shape::Rectangle, dynamic, limited.clone()),
            render(Shape::Rectangle, HighlightStyle::Flat, limited)
        );

        let oval = Shape::generic(|size, _, _| {
            crate::shape::Path::oval(crate::geometry::Rect::from_size(size))
        });
        assert_eq!(
            render(oval.clone(), dynamic, GlassConfig::default()),
            render(oval, HighlightStyle::Flat, GlassConfig::default())
        );

        assert_ne!(
            render(Shape::Rectangle, dynamic, GlassConfig::default()),
            render(Shape::Rectangle, HighlightStyle::Flat, GlassConfig::default())
        );
    }

    #[test]
    fn shadow_is_cut_out_of_the_shape() {
        let config = GlassConfig::default();
        let size = Size::new(10.0, 10.0);
        let outline = outline(Shape::Rectangle, size);
        let mut decorator = ShadowDecorator::new();
        decorator.attach(&config.layers);
        let mut target = Pixmap::new(30, 30);
        let shadow = Shadow {
            radius: Dp(6.0),
            offset: Vec2::new(0.0, 4.0),
            color: Color::BLACK,
            ..Shadow::default()
        };
        {
            let mut canvas = Canvas::new(&mut target);
            canvas.translate(Vec2::new(10.0, 10.0));
            decorator.draw(&mut canvas, shadow, &context(&outline, size, &config));
        }
        assert_eq!(target.get(15, 15)[3], 0.0);
        assert!(target.get(15, 21)[3] > 0.0);
        assert!(target.get(15, 21)[3] > target.get(15, 8)[3]);
    }

    #[test]
    fn inner_shadow_stays_inside_and_follows_the_offset() {
        let config = GlassConfig::default();
        let size = Size::new(20.0, 20.0);
        let outline = outline(Shape::Rectangle, size);
        let mut decorator = InnerShadowDecorator::new();
        decorator.attach(&config.layers);
        let mut target = Pixmap::new(40, 40);
        let shadow = InnerShadow {
            radius: Dp(2.0),
            offset: Vec2::new(0.0, 4.0),
            color: Color::BLACK,
            ..InnerShadow::default()
        };
        {
            let mut canvas = Canvas::new(&mut target);
            canvas.translate(Vec2::new(10.0, 10.0));
            decorator.draw(&mut canvas, shadow, &context(&outline, size, &config));
        }
        let top = target.get(20, 11)[3];
        let bottom = target.get(20, 28)[3];
        assert!(top > 0.5);
        assert!(top > bottom);
        assert_eq!(target.get(20, 5)[3], 0.0);
        assert_eq!(target.get(20, 35)[3], 0.0);
    }

    #[test]
    fn detach_releases_the_layer() {
        let config = GlassConfig::default();
        let mut decorator = ShadowDecorator::new();
        decorator.attach(&config.layers);
        decorator.attach(&config.layers);
        assert_eq!(config.layers.live(), 1);
        decorator.detach();
        decorator.detach();
        assert_eq!(config.layers.acquired(), 1);
        assert_eq!(config.layers.released(), 1);
    }
}
