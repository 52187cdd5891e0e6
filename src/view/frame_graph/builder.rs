use super::frame_graph::FrameGraphError;
use super::slot::{InSlot, OutSlot};
use super::texture_resource::{TextureDesc, TextureHandle, TextureResource};

/// Collects what one pass reads and writes while the graph compiles.
pub struct BuildContext<'a> {
    pub(crate) textures: &'a mut Vec<TextureDesc>,
    pub(crate) reads: &'a mut Vec<TextureHandle>,
    pub(crate) writes: &'a mut Vec<TextureHandle>,
    pub(crate) build_errors: &'a mut Vec<FrameGraphError>,
}

impl<'a> BuildContext<'a> {
    pub fn create_texture<Tag>(&mut self, desc: TextureDesc) -> OutSlot<TextureResource, Tag> {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(desc);
        self.writes.push(handle);
        OutSlot::with_handle(handle)
    }

    pub fn read_texture<Tag>(&mut self, input: &InSlot<TextureResource, Tag>) {
        match input.handle {
            Some(handle) => self.reads.push(handle),
            None => self
                .build_errors
                .push(FrameGraphError::MissingInput("texture slot has no handle")),
        }
    }

    pub fn write_texture<Tag>(&mut self, output: &OutSlot<TextureResource, Tag>) {
        match output.handle {
            Some(handle) => self.writes.push(handle),
            None => self
                .build_errors
                .push(FrameGraphError::MissingOutput("texture slot has no handle")),
        }
    }
}
