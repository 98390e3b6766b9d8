use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::{FrameView, DEPTH_FORMAT};

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    key_dir: [f32; 4],
    key_color: [f32; 4],
    fog_color: [f32; 4],
    fog_params: [f32; 4],
}

impl FrameUniform {
    pub(super) fn from_view(frame: &FrameView<'_>) -> Self {
        let (key_dir, key_color) = match frame.key_light() {
            Some((position, color, intensity)) => {
                let dir = position.try_normalize().unwrap_or(Vec3::Y);
                (dir.extend(0.0).to_array(), color.to_vec3().extend(intensity).to_array())
            }
            None => ([0.0, 1.0, 0.0, 0.0], [0.0; 4]),
        };
        let (fog_color, fog_params) = match frame.fog {
            Some(fog) => (fog.color.to_vec3().extend(1.0).to_array(), [fog.near, fog.far, 1.0, 0.0]),
            None => ([0.0; 4], [0.0; 4]),
        };
        Self {
            view_proj: frame.view_projection.to_cols_array_2d(),
            camera_pos: frame.camera_position.extend(1.0).to_array(),
            ambient: frame.ambient().extend(1.0).to_array(),
            key_dir,
            key_color,
            fog_color,
            fog_params,
        }
    }
}

/// One flat quad per drawable node, scaled by its extent.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Opaque markers first, translucent ones (the grid) after them.
pub fn build_instances(frame: &FrameView<'_>) -> Vec<MarkerInstance> {
    let mut instances: Vec<(bool, MarkerInstance)> = frame
        .drawables()
        .filter_map(|node| {
            let renderable = node.renderable?;
            let model = node.world * Mat4::from_scale(Vec3::splat(renderable.extent));
            Some((
                renderable.opacity < 1.0,
                MarkerInstance {
                    model: model.to_cols_array_2d(),
                    color: renderable.color.to_vec3().extend(renderable.opacity).to_array(),
                },
            ))
        })
        .collect();
    instances.sort_by_key(|(translucent, _)| *translucent);
    instances.into_iter().map(|(_, instance)| instance).collect()
}

#[derive(Default)]
pub struct MarkerPass {
    pipeline: Option<wgpu::RenderPipeline>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    frame_buf: Option<wgpu::Buffer>,
    frame_bg: Option<wgpu::BindGroup>,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,
    instance_count: u32,
}

impl MarkerPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn init_pipeline(&mut self, device: &wgpu::Device, surface_format: wgpu::TextureFormat) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Stage Marker Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../assets/shaders/stage_marker.wgsl").into()),
        });

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Marker Frame BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Marker Frame Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Marker Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buf.as_entire_binding() }],
        });

        // Unit quad in the local XY plane.
        let vertices: [[f32; 3]; 4] = [[-1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0]];
        let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker IB"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Marker Pipeline Layout"),
            bind_group_layouts: &[&frame_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Marker Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MarkerInstance>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute { shader_location: 1, format: wgpu::VertexFormat::Float32x4, offset: 0 },
                            wgpu::VertexAttribute { shader_location: 2, format: wgpu::VertexFormat::Float32x4, offset: 16 },
                            wgpu::VertexAttribute { shader_location: 3, format: wgpu::VertexFormat::Float32x4, offset: 32 },
                            wgpu::VertexAttribute { shader_location: 4, format: wgpu::VertexFormat::Float32x4, offset: 48 },
                            wgpu::VertexAttribute { shader_location: 5, format: wgpu::VertexFormat::Float32x4, offset: 64 },
                        ],
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        self.pipeline = Some(pipeline);
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.frame_buf = Some(frame_buf);
        self.frame_bg = Some(frame_bg);
        self.instance_buffer = None;
        self.instance_capacity = 0;
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if self.instance_capacity >= count && self.instance_buffer.is_some() {
            return;
        }
        let mut new_cap = self.instance_capacity.max(64);
        while new_cap < count {
            new_cap *= 2;
        }
        self.instance_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Marker Instance Buffer"),
            size: (new_cap * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }

    /// Uploads the frame uniform and instances for `frame`.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &FrameView<'_>) -> Result<()> {
        let instances = build_instances(frame);
        self.ensure_instance_capacity(device, instances.len());
        let frame_buf = self.frame_buf.as_ref().context("Marker pipeline not initialized")?;
        queue.write_buffer(frame_buf, 0, bytemuck::bytes_of(&FrameUniform::from_view(frame)));
        if !instances.is_empty() {
            let instance_buffer = self.instance_buffer.as_ref().context("Marker instance buffer missing")?;
            queue.write_buffer(instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.instance_count = instances.len() as u32;
        Ok(())
    }

    pub fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) -> Result<()> {
        if self.instance_count == 0 {
            return Ok(());
        }
        pass.set_pipeline(self.pipeline.as_ref().context("Marker pipeline not initialized")?);
        pass.set_bind_group(0, self.frame_bg.as_ref().context("Marker bind group missing")?, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.as_ref().context("Marker vertex buffer missing")?.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.as_ref().context("Marker instance buffer missing")?.slice(..));
        pass.set_index_buffer(
            self.index_buffer.as_ref().context("Marker index buffer missing")?.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        pass.draw_indexed(0..6, 0, 0..self.instance_count);
        Ok(())
    }
}
