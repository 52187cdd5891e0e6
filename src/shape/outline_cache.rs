use std::rc::Rc;

use super::{Outline, Shape, ShapeProvider};
use crate::geometry::{Density, LayoutDirection, Size};

#[derive(Debug, Clone, PartialEq)]
struct OutlineKey {
    shape: Shape,
    size: Size,
    layout_direction: LayoutDirection,
    density: Density,
}

/// Remembers the last resolved outline and hands out the same `Rc` until one of
/// shape, size, layout direction or density changes.
#[derive(Default)]
pub struct OutlineCache {
    key: Option<OutlineKey>,
    outline: Option<Rc<Outline>>,
    computations: u64,
}

impl OutlineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outline(
        &mut self,
        shape: &Shape,
        size: Size,
        layout_direction: LayoutDirection,
        density: Density,
    ) -> Rc<Outline> {
        if let (Some(key), Some(outline)) = (&self.key, &self.outline) {
            if key.shape == *shape
                && key.size == size
                && key.layout_direction == layout_direction
                && key.density == density
            {
                return outline.clone();
            }
        }

        let outline = Rc::new(shape.create_outline(size, layout_direction, density));
        self.computations += 1;
        self.key = Some(OutlineKey {
            shape: shape.clone(),
            size,
            layout_direction,
            density,
        });
        self.outline = Some(outline.clone());
        outline
    }

    /// Evaluates a dynamic shape and looks up its outline.
    pub fn outline_from(
        &mut self,
        provider: &ShapeProvider,
        size: Size,
        layout_direction: LayoutDirection,
        density: Density,
    ) -> Rc<Outline> {
        let shape = provider();
        self.outline(&shape, size, layout_direction, density)
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.outline = None;
    }
}
