//! Runs effect chains on the GPU through the frame graph.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::view::effect::{ColorMatrix, EffectKind, RenderEffect, is_effective};
use crate::view::frame_graph::{FrameGraph, FrameGraphError, TextureDesc};
use crate::view::pixmap::Pixmap;
use crate::view::render_pass::{EffectRenderPass, EffectTarget};
use crate::view::shader_cache::{BuiltinShader, ShaderCache, ShaderError, ShaderProgram};

/// Format of the textures between two effect draws.
pub const INTERMEDIATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Format [`GpuEffectRunner::upload`] produces.
pub const UPLOAD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Graph(#[from] FrameGraphError),
}

/// One fullscreen draw: a compiled program and its uniform block.
#[derive(Clone)]
pub struct GpuDraw {
    pub shader: Arc<ShaderProgram>,
    pub uniforms: [[f32; 4]; 6],
}

impl std::fmt::Debug for GpuDraw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDraw")
            .field("shader", &self.shader.key)
            .field("uniforms", &self.uniforms)
            .finish()
    }
}

/// Turns a [`RenderEffect`] into draws and records them. The frame graph and its
/// cached pipelines live as long as the runner.
pub struct GpuEffectRunner {
    shaders: Arc<ShaderCache>,
    graph: FrameGraph,
}

impl Default for GpuEffectRunner {
    fn default() -> Self {
        Self::new(ShaderCache::global())
    }
}

impl GpuEffectRunner {
    pub fn new(shaders: Arc<ShaderCache>) -> Self {
        Self {
            shaders,
            graph: FrameGraph::new(),
        }
    }

    /// Draws for `effect` over a `width` x `height` source. Blur splits into a
    /// horizontal and a vertical draw; zero-radius blurs vanish. An effect that
    /// plans to nothing still copies the source through an identity color matrix.
    pub fn plan(
        &self,
        effect: Option<&RenderEffect>,
        width: u32,
        height: u32,
    ) -> Result<Vec<GpuDraw>, GpuError> {
        let texel = TextureDesc::new(width, height, INTERMEDIATE_FORMAT).texel_size();
        let mut draws = Vec::new();
        for pass in effect.map(RenderEffect::passes).unwrap_or_default() {
            match pass.kind {
                EffectKind::Blur { radius, .. } if !is_effective(radius) => {}
                EffectKind::Blur { .. } => {
                    for direction in [[1.0, 0.0], [0.0, 1.0]] {
                        let mut uniforms = pass.kind.uniforms();
                        uniforms[0][0] = texel[0];
                        uniforms[0][1] = texel[1];
                        uniforms[1][0] = direction[0];
                        uniforms[1][1] = direction[1];
                        draws.push(GpuDraw {
                            shader: pass.shader.clone(),
                            uniforms,
                        });
                    }
                }
                kind => draws.push(GpuDraw {
                    shader: pass.shader.clone(),
                    uniforms: kind.uniforms(),
                }),
            }
        }
        if draws.is_empty() {
            draws.push(GpuDraw {
                shader: self.shaders.builtin(BuiltinShader::ColorMatrix)?,
                uniforms: EffectKind::ColorMatrix(ColorMatrix::IDENTITY).uniforms(),
            });
        }
        Ok(draws)
    }

    /// Uploads `pixmap` as a sampled texture in [`UPLOAD_FORMAT`].
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixmap: &Pixmap,
    ) -> wgpu::Texture {
        let desc = TextureDesc::new(pixmap.width(), pixmap.height(), UPLOAD_FORMAT);
        let mut bytes = pixmap.to_upload_bytes();
        if pixmap.is_empty() {
            bytes = vec![0; 4];
        }
        device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Backdrop Upload"),
                size: desc.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: UPLOAD_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &bytes,
        )
    }

    /// Records `effect` reading `source` and writing `target`. Both views must be
    /// `width` x `height`; `target_format` is the format `target` was created with.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        effect: Option<&RenderEffect>,
        source: &wgpu::TextureView,
        target: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        (width, height): (u32, u32),
    ) -> Result<(), GpuError> {
        let draws = self.plan(effect, width, height)?;
        self.graph.reset();

        let source_slot: EffectTarget = self.graph.import_texture(
            TextureDesc::new(width, height, UPLOAD_FORMAT),
            source.clone(),
        );
        let target_desc = TextureDesc::new(width, height, target_format);
        let target_slot: EffectTarget =
            self.graph.import_render_target(target_desc, target.clone());

        let last = draws.len() - 1;
        let mut input = source_slot.to_input();
        for (index, draw) in draws.into_iter().enumerate() {
            let output = if index == last {
                target_slot
            } else {
                self.graph
                    .declare_texture(TextureDesc::new(width, height, INTERMEDIATE_FORMAT))
            };
            let pass = EffectRenderPass::new(draw.shader, draw.uniforms, input, output);
            self.graph.add_pass(pass);
            input = output.to_input();
        }

        self.graph.compile()?;
        let passes = self.graph.pass_count();
        tracing::trace!(passes, width, height, "recording effect chain");
        self.graph.execute(device, encoder)?;
        Ok(())
    }
}
