use std::borrow::Cow;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use wgpu::util::DeviceExt;

use crate::view::frame_graph::PassContext;
use crate::view::frame_graph::builder::BuildContext;
use crate::view::frame_graph::slot::{InSlot, OutSlot};
use crate::view::frame_graph::texture_resource::TextureResource;
use crate::view::render_pass::RenderPass;
use crate::view::shader_cache::ShaderProgram;

const EFFECT_RESOURCES: u64 = 201;

pub struct EffectTag;

pub type EffectTarget = OutSlot<TextureResource, EffectTag>;

#[derive(Default)]
pub struct EffectInput {
    pub source: InSlot<TextureResource, EffectTag>,
}

#[derive(Default)]
pub struct EffectOutput {
    pub target: EffectTarget,
}

#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct EffectVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

/// Mirrors `EffectParams` in the effect shaders.
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct EffectUniforms {
    data: [[f32; 4]; 6],
}

struct EffectResources {
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: FxHashMap<(SmolStr, wgpu::TextureFormat), wgpu::RenderPipeline>,
}

/// Draws a fullscreen quad through one effect shader, reading `source` and replacing
/// the content of `target`.
pub struct EffectRenderPass {
    shader: Arc<ShaderProgram>,
    uniforms: [[f32; 4]; 6],
    input: EffectInput,
    output: EffectOutput,
}

impl EffectRenderPass {
    pub fn new(
        shader: Arc<ShaderProgram>,
        uniforms: [[f32; 4]; 6],
        source: InSlot<TextureResource, EffectTag>,
        target: EffectTarget,
    ) -> Self {
        Self {
            shader,
            uniforms,
            input: EffectInput { source },
            output: EffectOutput { target },
        }
    }

    pub fn shader_key(&self) -> &str {
        &self.shader.key
    }
}

impl RenderPass for EffectRenderPass {
    type Input = EffectInput;
    type Output = EffectOutput;

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn input_mut(&mut self) -> &mut Self::Input {
        &mut self.input
    }

    fn output(&self) -> &Self::Output {
        &self.output
    }

    fn output_mut(&mut self) -> &mut Self::Output {
        &mut self.output
    }

    fn build(&mut self, builder: &mut BuildContext) {
        builder.read_texture(&self.input.source);
        builder.write_texture(&self.output.target);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_, '_>) {
        let (Some(source), Some(target)) = (self.input.source.handle(), self.output.target.handle())
        else {
            return;
        };
        let Some(target_desc) = ctx.texture_desc(target) else {
            return;
        };
        let Some(source_view) = ctx.texture_view(source) else {
            return;
        };
        let Some(target_view) = ctx.texture_view(target) else {
            return;
        };

        let device = ctx.device;
        let resources = ctx
            .cache
            .get_or_insert_with::<EffectResources, _>(EFFECT_RESOURCES, || {
                create_resources(device)
            });
        let pipeline = resources
            .pipelines
            .entry((self.shader.key.clone(), target_desc.format()))
            .or_insert_with(|| {
                let format = target_desc.format();
                tracing::debug!(shader = %self.shader.key, ?format, "creating effect pipeline");
                create_pipeline(device, &resources.bind_group_layout, &self.shader, format)
            })
            .clone();

        let vertices = fullscreen_quad_vertices();
        let indices = fullscreen_quad_indices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Effect Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Effect Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniforms = EffectUniforms {
            data: self.uniforms,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Effect Params Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Effect Bind Group"),
            layout: &resources.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resources.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Effect"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
                resolve_target: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..indices.len() as u32, 0, 0..1);
    }
}

fn create_resources(device: &wgpu::Device) -> EffectResources {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Effect Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Effect Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    });

    EffectResources {
        bind_group_layout,
        sampler,
        pipelines: FxHashMap::default(),
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    program: &ShaderProgram,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.key.as_str()),
        source: wgpu::ShaderSource::Naga(Cow::Owned(program.module.clone())),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Effect Pipeline Layout"),
        bind_group_layouts: &[Some(bind_group_layout)],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(program.key.as_str()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<EffectVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 0,
                        shader_location: 0,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: std::mem::size_of::<[f32; 2]>() as u64,
                        shader_location: 1,
                    },
                ],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    })
}

fn fullscreen_quad_vertices() -> [EffectVertex; 4] {
    [
        EffectVertex {
            position: [-1.0, -1.0],
            uv: [0.0, 1.0],
        },
        EffectVertex {
            position: [1.0, -1.0],
            uv: [1.0, 1.0],
        },
        EffectVertex {
            position: [1.0, 1.0],
            uv: [1.0, 0.0],
        },
        EffectVertex {
            position: [-1.0, 1.0],
            uv: [0.0, 0.0],
        },
    ]
}

fn fullscreen_quad_indices() -> [u16; 6] {
    [0, 1, 2, 0, 2, 3]
}
