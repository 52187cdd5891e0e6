use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use slotmap::{SlotMap, new_key_type};

use crate::geometry::{Density, LayerTransform, LayoutDirection, Size};
use crate::shape::Outline;
use crate::style::BlendMode;
use crate::view::canvas::Canvas;
use crate::view::effect::RenderEffect;
use crate::view::pixmap::Pixmap;
use crate::view::software;

new_key_type! {
    pub struct LayerId;
}

#[derive(Default)]
struct AllocatorState {
    live: SlotMap<LayerId, ()>,
    acquired: u64,
    released: u64,
}

/// Hands out offscreen layers and tracks how many are alive.
#[derive(Clone, Default)]
pub struct LayerAllocator {
    state: Rc<RefCell<AllocatorState>>,
}

impl LayerAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> GraphicsLayer {
        let id = {
            let mut state = self.state.borrow_mut();
            state.acquired += 1;
            state.live.insert(())
        };
        tracing::trace!(?id, "layer acquired");
        GraphicsLayer::new(id, self.clone())
    }

    fn release(&self, id: LayerId) {
        let mut state = self.state.borrow_mut();
        if state.live.remove(id).is_some() {
            state.released += 1;
            tracing::trace!(?id, "layer released");
        } else {
            tracing::warn!(?id, "release of a layer that is not live");
        }
    }

    pub fn acquired(&self) -> u64 {
        self.state.borrow().acquired
    }

    pub fn released(&self) -> u64 {
        self.state.borrow().released
    }

    pub fn live(&self) -> usize {
        self.state.borrow().live.len()
    }
}

impl fmt::Debug for LayerAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LayerAllocator")
            .field("acquired", &state.acquired)
            .field("released", &state.released)
            .field("live", &state.live.len())
            .finish()
    }
}

/// An offscreen layer. Dropping it returns its slot to the allocator.
pub struct GraphicsLayer {
    id: LayerId,
    allocator: LayerAllocator,
    pixmap: Pixmap,
    size: Size,
    offset: Vec2,
    density: Density,
    layout_direction: LayoutDirection,
    render_effect: Option<RenderEffect>,
    clip: Option<Rc<Outline>>,
    transform: LayerTransform,
    alpha: f32,
    blend_mode: BlendMode,
}

impl GraphicsLayer {
    fn new(id: LayerId, allocator: LayerAllocator) -> Self {
        Self {
            id,
            allocator,
            pixmap: Pixmap::default(),
            size: Size::ZERO,
            offset: Vec2::ZERO,
            density: Density::ONE,
            layout_direction: LayoutDirection::Ltr,
            render_effect: None,
            clip: None,
            transform: LayerTransform::IDENTITY,
            alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Clears the layer to `size` and records new content.
    pub fn record(
        &mut self,
        size: Size,
        density: Density,
        layout_direction: LayoutDirection,
        draw: impl FnOnce(&mut Canvas<'_>),
    ) {
        let (width, height) = size.to_pixels();
        self.pixmap.reset(width, height);
        self.size = size;
        self.density = density;
        self.layout_direction = layout_direction;
        let mut canvas = Canvas::with_environment(&mut self.pixmap, density, layout_direction);
        draw(&mut canvas);
    }

    /// Draws on top of the recorded content.
    pub fn paint(&mut self, draw: impl FnOnce(&mut Canvas<'_>)) {
        let mut canvas =
            Canvas::with_environment(&mut self.pixmap, self.density, self.layout_direction);
        draw(&mut canvas);
    }

    /// Runs `effect` over the recorded content once, replacing it.
    pub fn bake_effect(&mut self, effect: &RenderEffect) {
        self.pixmap = software::apply_effect(effect, &self.pixmap);
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    pub fn render_effect(&self) -> Option<&RenderEffect> {
        self.render_effect.as_ref()
    }

    pub fn set_render_effect(&mut self, effect: Option<RenderEffect>) {
        self.render_effect = effect;
    }

    pub fn clip(&self) -> Option<&Outline> {
        self.clip.as_deref()
    }

    pub fn set_clip(&mut self, clip: Option<Rc<Outline>>) {
        self.clip = clip;
    }

    pub fn transform(&self) -> LayerTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: LayerTransform) {
        self.transform = transform;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }
}

impl Drop for GraphicsLayer {
    fn drop(&mut self) {
        self.allocator.release(self.id);
    }
}

impl fmt::Debug for GraphicsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsLayer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("effect", &self.render_effect.as_ref().map(RenderEffect::len))
            .finish()
    }
}
