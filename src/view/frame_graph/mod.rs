//! A small render graph: passes declare the textures they read and write, the graph
//! orders them and allocates transient targets.

pub(crate) mod builder;
mod frame_graph;
pub(crate) mod slot;
pub(crate) mod texture_resource;

pub use builder::BuildContext;
pub use frame_graph::{FrameGraph, FrameGraphError, PassContext, PassHandle, ResourceCache};
pub use slot::{InSlot, OutSlot, ResourceType};
pub use texture_resource::{TextureDesc, TextureHandle, TextureResource};
