use std::rc::Rc;

use super::{Capabilities, EffectKind, GlassConfig, RenderEffect};
use crate::geometry::{Density, LayoutDirection, Size};
use crate::shape::{Outline, Shape};

/// Builder threaded through a node's effect closure. Every effect function wraps the
/// accumulated chain, so effects apply in call order.
pub struct EffectScope {
    size: Size,
    density: Density,
    layout_direction: LayoutDirection,
    shape: Shape,
    outline: Rc<Outline>,
    config: GlassConfig,
    effect: Option<RenderEffect>,
}

impl EffectScope {
    pub fn new(
        size: Size,
        density: Density,
        layout_direction: LayoutDirection,
        shape: Shape,
        outline: Rc<Outline>,
        config: GlassConfig,
    ) -> Self {
        Self {
            size,
            density,
            layout_direction,
            shape,
            outline,
            config,
            effect: None,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn density(&self) -> Density {
        self.density
    }

    pub fn layout_direction(&self) -> LayoutDirection {
        self.layout_direction
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn outline(&self) -> &Rc<Outline> {
        &self.outline
    }

    pub fn capabilities(&self) -> Capabilities {
        self.config.capabilities
    }

    pub fn config(&self) -> &GlassConfig {
        &self.config
    }

    pub fn render_effect(&self) -> Option<&RenderEffect> {
        self.effect.as_ref()
    }

    pub fn into_effect(self) -> Option<RenderEffect> {
        self.effect
    }

    /// Chains a prepared effect onto the accumulated one.
    pub fn effect(&mut self, effect: RenderEffect) -> &mut Self {
        self.effect = Some(match self.effect.take() {
            Some(inner) => RenderEffect::chain(effect, inner),
            None => effect,
        });
        self
    }

    pub(super) fn push(&mut self, kind: EffectKind, required: Capabilities) -> &mut Self {
        match self.config.effect(kind, required) {
            Some(effect) => self.effect(effect),
            None => self,
        }
    }
}
