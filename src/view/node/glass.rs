use std::fmt;
use std::rc::Rc;

use crate::geometry::{Density, LayerTransform, LayoutCoordinates, LayoutDirection, Size};
use crate::shape::{Outline, OutlineCache, Shape, ShapeProvider};
use crate::view::backdrop::{Backdrop, LayerBackdrop, backdrop_id};
use crate::view::canvas::Canvas;
use crate::view::effect::{Capabilities, EffectScope, GlassConfig, RenderEffect};
use crate::view::layer::GraphicsLayer;

use super::decorator::{
    DecorationContext, Highlight, HighlightDecorator, InnerShadow, InnerShadowDecorator, Shadow,
    ShadowDecorator,
};

pub type EffectsFn = Rc<dyn Fn(&mut EffectScope)>;
pub type SurfaceDrawFn = Box<dyn Fn(&mut Canvas<'_>, &Outline)>;

/// Everything the effect chain depends on, resolved once per frame.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    shape: Shape,
    size: Size,
    density: Density,
    layout_direction: LayoutDirection,
    backdrop: usize,
    highlight: Option<Highlight>,
    shadow: Option<Shadow>,
    inner_shadow: Option<InnerShadow>,
    transform: LayerTransform,
    effect: Option<RenderEffect>,
}

/// Samples a backdrop behind a surface, runs it through an effect chain and draws it
/// under the surface's content, with optional shadows and a highlight.
pub struct GlassNode {
    config: GlassConfig,
    backdrop: Rc<dyn Backdrop>,
    shape: ShapeProvider,
    effects: Option<EffectsFn>,
    highlight: Option<Box<dyn Fn() -> Highlight>>,
    shadow: Option<Box<dyn Fn() -> Shadow>>,
    inner_shadow: Option<Box<dyn Fn() -> InnerShadow>>,
    layer_transform: Option<Box<dyn Fn(Size) -> LayerTransform>>,
    on_draw_behind: Option<SurfaceDrawFn>,
    on_draw_surface: Option<SurfaceDrawFn>,
    exported: Option<Rc<LayerBackdrop>>,

    layer: Option<GraphicsLayer>,
    highlight_layer: HighlightDecorator,
    shadow_layer: ShadowDecorator,
    inner_shadow_layer: InnerShadowDecorator,
    coordinates: Option<LayoutCoordinates>,
    outlines: OutlineCache,
    outline: Option<Rc<Outline>>,
    snapshot: Option<Snapshot>,
    valid: bool,
    effect_builds: u64,
}

impl GlassNode {
    pub fn new(backdrop: Rc<dyn Backdrop>, shape: ShapeProvider, config: GlassConfig) -> Self {
        Self {
            config,
            backdrop,
            shape,
            effects: None,
            highlight: None,
            shadow: None,
            inner_shadow: None,
            layer_transform: None,
            on_draw_behind: None,
            on_draw_surface: None,
            exported: None,
            layer: None,
            highlight_layer: HighlightDecorator::new(),
            shadow_layer: ShadowDecorator::new(),
            inner_shadow_layer: InnerShadowDecorator::new(),
            coordinates: None,
            outlines: OutlineCache::new(),
            outline: None,
            snapshot: None,
            valid: false,
            effect_builds: 0,
        }
    }

    pub fn effects(mut self, effects: impl Fn(&mut EffectScope) + 'static) -> Self {
        self.effects = Some(Rc::new(effects));
        self
    }

    pub fn highlight(mut self, highlight: impl Fn() -> Highlight + 'static) -> Self {
        self.highlight = Some(Box::new(highlight));
        self
    }

    pub fn shadow(mut self, shadow: impl Fn() -> Shadow + 'static) -> Self {
        self.shadow = Some(Box::new(shadow));
        self
    }

    pub fn inner_shadow(mut self, inner_shadow: impl Fn() -> InnerShadow + 'static) -> Self {
        self.inner_shadow = Some(Box::new(inner_shadow));
        self
    }

    /// Transform applied to the surface after layout. The backdrop is counter-transformed
    /// so it stays aligned with what is actually behind the surface.
    pub fn layer_transform(mut self, transform: impl Fn(Size) -> LayerTransform + 'static) -> Self {
        self.layer_transform = Some(Box::new(transform));
        self
    }

    pub fn on_draw_behind(mut self, draw: impl Fn(&mut Canvas<'_>, &Outline) + 'static) -> Self {
        self.on_draw_behind = Some(Box::new(draw));
        self
    }

    pub fn on_draw_surface(mut self, draw: impl Fn(&mut Canvas<'_>, &Outline) + 'static) -> Self {
        self.on_draw_surface = Some(Box::new(draw));
        self
    }

    /// Records the finished surface into `backdrop` so nested glass can sample it. The
    /// caller owns the backdrop's attachment.
    pub fn exported_backdrop(mut self, backdrop: Rc<LayerBackdrop>) -> Self {
        self.exported = Some(backdrop);
        self
    }

    pub fn is_attached(&self) -> bool {
        self.layer.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// How many times the effect chain was built.
    pub fn effect_builds(&self) -> u64 {
        self.effect_builds
    }

    pub fn render_effect(&self) -> Option<&RenderEffect> {
        self.layer.as_ref().and_then(GraphicsLayer::render_effect)
    }

    pub fn highlight_renders(&self) -> u64 {
        self.highlight_layer.renders()
    }

    pub fn shadow_renders(&self) -> u64 {
        self.shadow_layer.renders()
    }

    pub fn inner_shadow_renders(&self) -> u64 {
        self.inner_shadow_layer.renders()
    }

    /// Acquires the node's layers. Without offscreen layers the node stays detached and
    /// only draws its content.
    pub fn attach(&mut self) {
        if self.layer.is_some() {
            return;
        }
        if !self.config.supports(Capabilities::OFFSCREEN_LAYERS) {
            tracing::debug!("offscreen layers unavailable, glass draws content only");
            return;
        }
        let layers = &self.config.layers;
        self.layer = Some(layers.acquire());
        if self.highlight.is_some() {
            self.highlight_layer.attach(layers);
        }
        if self.shadow.is_some() {
            self.shadow_layer.attach(layers);
        }
        if self.inner_shadow.is_some() {
            self.inner_shadow_layer.attach(layers);
        }
        self.valid = false;
    }

    pub fn on_placed(&mut self, coordinates: LayoutCoordinates) {
        self.coordinates = Some(coordinates);
        if let Some(exported) = &self.exported {
            exported.position(coordinates);
        }
    }

    /// Swapping the backdrop invalidates the chain on the next [`GlassNode::update`].
    pub fn set_backdrop(&mut self, backdrop: Rc<dyn Backdrop>) {
        self.backdrop = backdrop;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn set_effects(&mut self, effects: impl Fn(&mut EffectScope) + 'static) {
        self.effects = Some(Rc::new(effects));
        self.valid = false;
    }

    /// Resolves every input of the effect chain, including the chain itself, and
    /// invalidates it when any of them differs from the previous frame.
    pub fn update(&mut self, density: Density, layout_direction: LayoutDirection) {
        let Some(coordinates) = self.coordinates else {
            return;
        };
        let size = coordinates.size;
        let shape = (self.shape)();
        let outline = self.outlines.outline(&shape, size, layout_direction, density);
        let effect = self.resolve_effect(&shape, size, density, layout_direction, &outline);
        let snapshot = Snapshot {
            shape,
            size,
            density,
            layout_direction,
            backdrop: backdrop_id(&self.backdrop),
            highlight: self.highlight.as_ref().map(|f| f()),
            shadow: self.shadow.as_ref().map(|f| f()),
            inner_shadow: self.inner_shadow.as_ref().map(|f| f()),
            transform: self
                .layer_transform
                .as_ref()
                .map_or(LayerTransform::IDENTITY, |f| f(size)),
            effect,
        };
        if self.snapshot.as_ref() != Some(&snapshot) {
            self.valid = false;
        }
        self.snapshot = Some(snapshot);
        self.outline = Some(outline);
    }

    /// Draws the glass surface and `content`. A detached or unplaced node draws only
    /// `content`.
    pub fn draw(&mut self, canvas: &mut Canvas<'_>, content: impl FnOnce(&mut Canvas<'_>)) {
        if self.layer.is_none() || self.coordinates.is_none() {
            content(canvas);
            return;
        }
        if self.snapshot.is_none() {
            self.update(canvas.density(), canvas.layout_direction());
        }
        let Some(exported) = self.exported.clone() else {
            self.draw_surface(canvas, content);
            return;
        };
        let mut content = Some(content);
        let recorded = exported.record(canvas.density(), canvas.layout_direction(), |layer| {
            if let Some(content) = content.take() {
                self.draw_surface(layer, content);
            }
        });
        if recorded {
            exported.draw_captured(canvas);
        } else if let Some(content) = content.take() {
            self.draw_surface(canvas, content);
        }
    }

    // Runs the effects closure into a scratch scope. Only the resulting chain is
    // compared, so unrelated state never invalidates the node.
    fn resolve_effect(
        &self,
        shape: &Shape,
        size: Size,
        density: Density,
        layout_direction: LayoutDirection,
        outline: &Rc<Outline>,
    ) -> Option<RenderEffect> {
        let effects = self.effects.as_ref()?;
        let mut scope = EffectScope::new(
            size,
            density,
            layout_direction,
            shape.clone(),
            outline.clone(),
            self.config.clone(),
        );
        effects(&mut scope);
        scope.into_effect()
    }

    fn rebuild(&mut self, snapshot: &Snapshot, outline: &Rc<Outline>) {
        if let Some(layer) = self.layer.as_mut() {
            layer.set_render_effect(snapshot.effect.clone());
            layer.set_clip(Some(outline.clone()));
        }
        self.effect_builds += 1;
        self.valid = true;
        tracing::debug!(builds = self.effect_builds, "glass effect chain rebuilt");
    }

    fn draw_surface(&mut self, canvas: &mut Canvas<'_>, content: impl FnOnce(&mut Canvas<'_>)) {
        let (Some(snapshot), Some(outline), Some(coordinates)) =
            (self.snapshot.clone(), self.outline.clone(), self.coordinates)
        else {
            content(canvas);
            return;
        };
        if !self.valid {
            self.rebuild(&snapshot, &outline);
        }
        let size = snapshot.size;
        let ctx = DecorationContext {
            size,
            density: snapshot.density,
            layout_direction: snapshot.layout_direction,
            outline: &outline,
            config: &self.config,
        };
        let placement = snapshot.transform.to_affine(size);
        let counter = snapshot.transform.inverse_affine(size);

        canvas.with_transform(placement, |canvas| {
            if let Some(shadow) = snapshot.shadow {
                self.shadow_layer.draw(canvas, shadow, &ctx);
            }
            if let Some(draw) = &self.on_draw_behind {
                draw(canvas, &outline);
            }
            if let Some(layer) = self.layer.as_mut() {
                let backdrop = &self.backdrop;
                layer.record(size, snapshot.density, snapshot.layout_direction, |recording| {
                    if let Some(counter) = counter {
                        recording.with_transform(counter, |recording| {
                            backdrop.draw_backdrop(recording, Some(&coordinates));
                        });
                    }
                });
                layer.set_alpha(snapshot.transform.alpha);
                canvas.draw_layer(layer);
            }
            if let Some(inner_shadow) = snapshot.inner_shadow {
                self.inner_shadow_layer.draw(canvas, inner_shadow, &ctx);
            }
            if let Some(draw) = &self.on_draw_surface {
                draw(canvas, &outline);
            }
            content(canvas);
            if let Some(highlight) = snapshot.highlight {
                self.highlight_layer.draw(canvas, highlight, &ctx);
            }
        });
    }

    /// Releases every owned layer. The node may be attached again.
    pub fn detach(&mut self) {
        self.layer = None;
        self.highlight_layer.detach();
        self.shadow_layer.detach();
        self.inner_shadow_layer.detach();
        self.coordinates = None;
        self.snapshot = None;
        self.outline = None;
        self.valid = false;
    }
}

impl fmt::Debug for GlassNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlassNode")
            .field("attached", &self.is_attached())
            .field("valid", &self.valid)
            .field("effect_builds", &self.effect_builds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Dp, Rect};
    use crate::style::{BlendMode, Color};
    use crate::ui::State;
    use crate::view::backdrop::{BackdropPhase, CanvasBackdrop};
    use crate::view::pixmap::Pixmap;
    use glam::Vec2;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn gradient_backdrop() -> Rc<dyn Backdrop> {
        Rc::new(CanvasBackdrop::new(|canvas| {
            for x in 0..48u8 {
                let column = Rect::new(x as f32, 0.0, x as f32 + 1.0, 48.0);
                canvas.fill_rect(column, Color::rgb(x * 5, 80, 200), BlendMode::SrcOver);
            }
        }))
    }

    fn solid_backdrop(color: Color) -> Rc<dyn Backdrop> {
        Rc::new(CanvasBackdrop::new(move |canvas| canvas.clear(color)))
    }

    fn placed(mut node: GlassNode, size: Size) -> GlassNode {
        node.attach();
        node.on_placed(LayoutCoordinates::at(Vec2::ZERO, size));
        node
    }

    fn content(canvas: &mut Canvas<'_>) {
        let white = Color::rgba(255, 255, 255, 100);
        canvas.fill_rect(Rect::new(2.0, 2.0, 6.0, 6.0), white, BlendMode::SrcOver);
    }

    fn render(node: &mut GlassNode, width: u32, height: u32) -> Pixmap {
        let mut target = Pixmap::new(width, height);
        {
            let mut canvas = Canvas::new(&mut target);
            node.update(canvas.density(), canvas.layout_direction());
            node.draw(&mut canvas, content);
        }
        target
    }

    fn content_only(width: u32, height: u32) -> Pixmap {
        let mut target = Pixmap::new(width, height);
        content(&mut Canvas::new(&mut target));
        target
    }

    #[test]
    fn zero_blur_on_a_circle_matches_no_blur() {
        let size = Size::new(48.0, 48.0);
        let config = GlassConfig::default();
        let circle = || Shape::Circle.into_provider();
        let mut plain = placed(GlassNode::new(gradient_backdrop(), circle(), config.clone()), size);
        let mut zero = placed(
            GlassNode::new(gradient_backdrop(), circle(), config.clone()).effects(|scope| {
                scope.blur(Dp(0.0));
            }),
            size,
        );
        let mut blurred = placed(
            GlassNode::new(gradient_backdrop(), circle(), config).effects(|scope| {
                scope.blur(Dp(4.0));
            }),
            size,
        );
        let expected = render(&mut plain, 48, 48);
        assert!(zero.render_effect().is_none());
        assert_eq!(render(&mut zero, 48, 48), expected);
        assert_ne!(render(&mut blurred, 48, 48), expected);
    }

    #[test]
    fn zero_width_highlight_composites_nothing() {
        let size = Size::new(24.0, 24.0);
        let config = GlassConfig::default();
        let shape = || Shape::rounded_dp(6.0).into_provider();
        let mut plain = placed(GlassNode::new(gradient_backdrop(), shape(), config.clone()), size);
        let mut highlighted = placed(
            GlassNode::new(gradient_backdrop(), shape(), config)
                .highlight(|| Highlight::flat(Dp(0.0), Color::WHITE)),
            size,
        );
        assert_eq!(render(&mut highlighted, 24, 24), render(&mut plain, 24, 24));
        assert_eq!(highlighted.highlight_renders(), 0);
    }

    #[test]
    fn unchanged_frames_reuse_the_chain() {
        let size = Size::new(32.0, 32.0);
        let radius = State::new(8.0_f32);
        let shape_radius = radius.clone();
        let mut node = placed(
            GlassNode::new(
                gradient_backdrop(),
                Rc::new(move || Shape::rounded_dp(shape_radius.get())),
                GlassConfig::default(),
            )
            .effects(|scope| {
                scope.blur(Dp(2.0)).vibrancy();
            })
            .highlight(Highlight::default),
            size,
        );
        render(&mut node, 32, 32);
        render(&mut node, 32, 32);
        assert_eq!(node.effect_builds(), 1);
        assert_eq!(node.highlight_renders(), 1);
        assert!(node.is_valid());

        radius.set(12.0);
        render(&mut node, 32, 32);
        assert_eq!(node.effect_builds(), 2);
        assert_eq!(node.highlight_renders(), 2);

        node.invalidate();
        render(&mut node, 32, 32);
        assert_eq!(node.effect_builds(), 3);

        node.set_effects(|scope| {
            scope.blur(Dp(3.0));
        });
        render(&mut node, 32, 32);
        assert_eq!(node.effect_builds(), 4);
        assert_eq!(node.render_effect().map(RenderEffect::len), Some(1));

        node.set_backdrop(solid_backdrop(RED));
        render(&mut node, 32, 32);
        render(&mut node, 32, 32);
        assert_eq!(node.effect_builds(), 5);
    }

    #[test]
    fn unrelated_state_writes_keep_the_chain() {
        let size = Size::new(24.0, 24.0);
        let radius = State::new(2.0_f32);
        let blur_radius = radius.clone();
        let mut node = placed(
            GlassNode::new(
                gradient_backdrop(),
                Shape::Circle.into_provider(),
                GlassConfig::default(),
            )
            .effects(move |scope| {
                scope.blur(Dp(blur_radius.get()));
            }),
            size,
        );
        render(&mut node, 24, 24);
        assert_eq!(node.effect_builds(), 1);

        State::new(0).set(1);
        render(&mut node, 24, 24);
        assert_eq!(node.effect_builds(), 1);

        radius.set(2.0);
        render(&mut node, 24, 24);
        assert_eq!(node.effect_builds(), 1);

        radius.set(5.0);
        render(&mut node, 24, 24);
        assert_eq!(node.effect_builds(), 2);
    }

    #[test]
    fn nan_blur_matches_no_effect() {
        let size = Size::new(32.0, 32.0);
        let config = GlassConfig::default();
        let circle = || Shape::Circle.into_provider();
        let mut plain = placed(GlassNode::new(gradient_backdrop(), circle(), config.clone()), size);
        let mut poisoned = placed(
            GlassNode::new(gradient_backdrop(), circle(), config).effects(|scope| {
                scope.blur(Dp(f32::NAN)).refraction(Dp(f32::NAN), Dp(f32::NAN), true);
            }),
            size,
        );
        let rendered = render(&mut poisoned, 32, 32);
        assert!(poisoned.render_effect().is_none());
        assert!(rendered.pixels().iter().flatten().all(|channel| channel.is_finite()));
        assert_eq!(rendered, render(&mut plain, 32, 32));
    }

    #[test]
    fn detach_releases_every_layer_exactly_once() {
        let config = GlassConfig::default();
        let circle = Shape::Circle.into_provider();
        let mut node = GlassNode::new(gradient_backdrop(), circle, config.clone())
            .highlight(Highlight::default)
            .shadow(Shadow::default)
            .inner_shadow(InnerShadow::default);
        for _ in 0..5 {
            node.attach();
            node.attach();
            node.detach();
            node.detach();
        }
        assert_eq!(config.layers.acquired(), 20);
        assert_eq!(config.layers.released(), 20);

        node.attach();
        assert_eq!(config.layers.live(), 4);
        drop(node);
        assert_eq!(config.layers.live(), 0);
        assert_eq!(config.layers.released(), config.layers.acquired());
    }

    #[test]
    fn without_offscreen_layers_only_content_is_drawn() {
        let config = GlassConfig::new(Capabilities::RENDER_EFFECTS | Capabilities::RUNTIME_SHADERS);
        let mut node = placed(
            GlassNode::new(solid_backdrop(RED), Shape::Rectangle.into_provider(), config.clone())
                .effects(|scope| {
                    scope.blur(Dp(4.0));
                }),
            Size::new(8.0, 8.0),
        );
        assert!(!node.is_attached());
        assert_eq!(render(&mut node, 8, 8), content_only(8, 8));
        assert_eq!(config.layers.acquired(), 0);
    }

    #[test]
    fn unplaced_node_draws_only_content() {
        let rectangle = Shape::Rectangle.into_provider();
        let mut node = GlassNode::new(solid_backdrop(RED), rectangle, GlassConfig::default());
        node.attach();
        assert_eq!(render(&mut node, 8, 8), content_only(8, 8));
        assert_eq!(node.effect_builds(), 0);
    }

    #[test]
    fn layer_transform_counter_transforms_the_backdrop() {
        let backdrop: Rc<dyn Backdrop> = Rc::new(CanvasBackdrop::new(|canvas| {
            canvas.fill_rect(Rect::new(0.0, 0.0, 4.0, 16.0), RED, BlendMode::SrcOver);
            canvas.fill_rect(Rect::new(4.0, 0.0, 16.0, 16.0), BLUE, BlendMode::SrcOver);
        }));
        let mut node = placed(
            GlassNode::new(backdrop, Shape::Rectangle.into_provider(), GlassConfig::default())
                .layer_transform(|_| LayerTransform {
                    scale_x: 2.0,
                    scale_y: 2.0,
                    ..LayerTransform::IDENTITY
                }),
            Size::new(16.0, 16.0),
        );
        let mut target = Pixmap::new(16, 16);
        node.update(Density::ONE, LayoutDirection::Ltr);
        node.draw(&mut Canvas::new(&mut target), |_| {});
        assert_eq!(target.get(1, 8), RED.to_premultiplied());
        assert_eq!(target.get(5, 8), BLUE.to_premultiplied());
    }

    #[test]
    fn exported_backdrop_receives_the_finished_surface() {
        let config = GlassConfig::default();
        let size = Size::new(8.0, 8.0);
        let shape = || Shape::rounded_dp(2.0).into_provider();
        let mut direct = placed(GlassNode::new(gradient_backdrop(), shape(), config.clone()), size);
        let expected = render(&mut direct, 8, 8);

        let exported = Rc::new(LayerBackdrop::new(None));
        exported.attach(&config.layers);
        let mut node = placed(
            GlassNode::new(gradient_backdrop(), shape(), config.clone())
                .exported_backdrop(exported.clone()),
            size,
        );
        assert_eq!(exported.phase(), BackdropPhase::Positioned);
        assert_eq!(render(&mut node, 8, 8), expected);

        let caller = LayoutCoordinates::at(Vec2::new(2.0, 2.0), Size::new(4.0, 4.0));
        let mut nested = Pixmap::new(4, 4);
        exported.draw_backdrop(&mut Canvas::new(&mut nested), Some(&caller));
        assert_eq!(nested.get(0, 0), expected.get(2, 2));

        node.detach();
        assert_eq!(exported.phase(), BackdropPhase::Positioned);
    }

    #[test]
    fn sampling_its_own_export_is_skipped() {
        let config = GlassConfig::default();
        let exported = Rc::new(LayerBackdrop::new(None));
        exported.attach(&config.layers);
        let backdrop: Rc<dyn Backdrop> = exported.clone();
        let mut node = placed(
            GlassNode::new(backdrop, Shape::Rectangle.into_provider(), config)
                .exported_backdrop(exported),
            Size::new(8.0, 8.0),
        );
        assert_eq!(render(&mut node, 8, 8), content_only(8, 8));
    }
}
