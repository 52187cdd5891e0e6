use std::rc::Rc;

use crate::geometry::LayoutCoordinates;
use crate::view::backdrop::LayerBackdrop;
use crate::view::canvas::Canvas;
use crate::view::effect::GlassConfig;

/// Records a surface's content into a [`LayerBackdrop`] so surfaces drawn later can
/// sample it.
pub struct BackdropCaptureNode {
    backdrop: Rc<LayerBackdrop>,
    config: GlassConfig,
}

impl BackdropCaptureNode {
    pub fn new(backdrop: Rc<LayerBackdrop>, config: GlassConfig) -> Self {
        Self { backdrop, config }
    }

    pub fn backdrop(&self) -> &Rc<LayerBackdrop> {
        &self.backdrop
    }

    pub fn attach(&mut self) {
        self.backdrop.attach(&self.config.layers);
    }

    pub fn on_placed(&mut self, coordinates: LayoutCoordinates) {
        self.backdrop.position(coordinates);
    }

    /// Records `content` into the backdrop and draws the capture. Draws `content`
    /// directly while the backdrop cannot record.
    pub fn draw(&mut self, canvas: &mut Canvas<'_>, content: impl FnOnce(&mut Canvas<'_>)) {
        let mut content = Some(content);
        let recorded = self
            .backdrop
            .record(canvas.density(), canvas.layout_direction(), |layer| {
                if let Some(content) = content.take() {
                    content(layer);
                }
            });
        if recorded {
            self.backdrop.draw_captured(canvas);
        } else if let Some(content) = content.take() {
            content(canvas);
        }
    }

    pub fn detach(&mut self) {
        self.backdrop.detach();
    }
}
