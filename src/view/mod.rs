pub mod backdrop;
pub mod canvas;
pub mod effect;
pub mod frame_graph;
pub mod gpu;
pub mod layer;
pub mod node;
pub mod pixmap;
pub mod render_pass;
pub mod shader_cache;
pub mod software;

pub use backdrop::*;
pub use canvas::{Canvas, MaskMode};
pub use effect::{
    Capabilities, ColorMatrix, EdgeTreatment, EffectKind, EffectPass, EffectScope, GlassConfig,
    HighlightParams, LensParams, RenderEffect,
};
pub use gpu::{GpuDraw, GpuEffectRunner, GpuError};
pub use layer::{GraphicsLayer, LayerAllocator, LayerId};
pub use node::*;
pub use pixmap::{Pixel, Pixmap};
pub use shader_cache::{BuiltinShader, ShaderCache, ShaderError, ShaderProgram};
