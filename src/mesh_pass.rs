//! Base scene pass: 3D meshes with depth testing and texturing.
//!
//! [`MeshPass`] renders the frame's queued meshes into the color target while
//! writing the shared [`DepthBuffer`](crate::DepthBuffer). The projector passes
//! run afterwards and re-render receiving geometry depth-tested against the same
//! buffer, which is what pins projected textures onto visible surfaces.
//!
//! Per-instance data travels through one uniform buffer with dynamic offsets:
//! every draw call gets a 256-byte slot, all slots are written through the queue,
//! and each draw binds its slot by offset.

use crate::blit::Blitter;
use crate::camera::Camera;
use crate::color::Color;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::render_graph::DepthBuffer;
use crate::texture::Texture;

/// Alignment of dynamic uniform slots; the wgpu default limit.
pub(crate) const UNIFORM_STRIDE: u64 = 256;

/// Per-frame camera uniforms shared by the scene and projector pipelines.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
}

impl CameraUniforms {
    pub(crate) fn new(camera: &Camera, time: f32) -> Self {
        let view = camera.view_matrix();
        let proj = camera.projection_matrix();
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            time,
        }
    }
}

/// Per-instance model uniforms.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ModelUniforms {
    pub(crate) fn new(transform: Transform, color: Color) -> Self {
        let model = transform.matrix();
        // Inverse transpose handles non-uniform scaling
        let normal_matrix = model.inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

/// Round a uniform block size up to a valid dynamic-offset stride.
pub(crate) fn aligned_stride(size: u64) -> u64 {
    size.next_multiple_of(UNIFORM_STRIDE)
}

/// A growable uniform buffer of fixed-stride slots addressed with dynamic
/// offsets. The stride is the uniform block size rounded up to the 256-byte
/// alignment limit.
pub(crate) struct SlotBuffer {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    capacity: u32,
    stride: u64,
    label: &'static str,
}

impl SlotBuffer {
    /// Slots of the default 256-byte stride.
    pub(crate) fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        capacity: u32,
    ) -> Self {
        Self::with_block_size(device, layout, label, capacity, UNIFORM_STRIDE)
    }

    /// Slots sized for uniform blocks of `block_size` bytes.
    pub(crate) fn with_block_size(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        capacity: u32,
        block_size: u64,
    ) -> Self {
        let stride = aligned_stride(block_size);
        let (buffer, bind_group) = Self::allocate(device, layout, label, capacity, stride);
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
            label,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        capacity: u32,
        stride: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: std::num::NonZeroU64::new(stride),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Grow to hold at least `count` slots. Must be called before any slot of
    /// the frame is bound.
    pub(crate) fn ensure(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        count: u32,
    ) {
        if count > self.capacity {
            let capacity = count.next_power_of_two();
            let (buffer, bind_group) =
                Self::allocate(device, layout, self.label, capacity, self.stride);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
    }

    /// Write `value` into slot `slot`.
    pub(crate) fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, slot: u32, value: &T) {
        queue.write_buffer(
            &self.buffer,
            slot as u64 * self.stride,
            bytemuck::bytes_of(value),
        );
    }

    /// Dynamic offset of slot `slot`.
    pub(crate) fn offset(&self, slot: u32) -> u32 {
        (slot as u64 * self.stride) as u32
    }
}

/// A draw call queued for the scene pass.
pub struct DrawCall<'a> {
    /// The mesh geometry to render.
    pub mesh: &'a Mesh,
    /// World-space transform for this instance.
    pub transform: Transform,
    /// Color tint, multiplied with the texture.
    pub color: Color,
    /// Optional surface texture. `None` uses a 1x1 white fallback.
    pub texture: Option<&'a Texture>,
}

/// Renders textured, lit meshes with depth testing.
///
/// Bind groups: 0 = camera, 1 = model (dynamic offset), 2 = texture + sampler.
/// The depth attachment comes from the shared [`DepthBuffer`]; the pass writes
/// depth with a standard Less comparison.
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    models: SlotBuffer,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    default_texture: Texture,
    blitter: Blitter,
}

impl MeshPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // Camera uniform buffer (group 0)
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mesh Camera Bind Group Layout"),
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

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Model slots (group 1, dynamic offset)
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let models = SlotBuffer::new(device, &model_layout, "Mesh Model Slots", 64);

        // Texture bind group layout (group 2)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mesh Texture Bind Group Layout"),
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
                ],
            });

        let default_texture =
            Texture::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "Default White Texture");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &model_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            model_layout,
            models,
            texture_bind_group_layout,
            default_texture,
            blitter: Blitter::new(gpu),
        }
    }

    /// Bind a texture and its sampler for the mesh shader (group 2).
    pub fn create_texture_bind_group(
        &self,
        gpu: &GpuContext,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Composite an input texture as the background of the current pass.
    pub fn blit(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        input_view: &wgpu::TextureView,
    ) {
        self.blitter.blit(gpu, render_pass, input_view);
    }

    /// Render a list of draw calls.
    ///
    /// Camera uniforms are written once; each draw call gets its own model slot
    /// and texture bind group. Returns early if `draw_calls` is empty.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        camera: &Camera,
        time: f32,
        draw_calls: &[DrawCall],
    ) {
        if draw_calls.is_empty() {
            return;
        }

        self.models
            .ensure(&gpu.device, &self.model_layout, draw_calls.len() as u32);

        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms::new(camera, time)),
        );

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (i, call) in draw_calls.iter().enumerate() {
            let slot = i as u32;
            self.models.write(
                &gpu.queue,
                slot,
                &ModelUniforms::new(call.transform, call.color),
            );
            render_pass.set_bind_group(1, &self.models.bind_group, &[self.models.offset(slot)]);

            let texture = call.texture.unwrap_or(&self.default_texture);
            let texture_bind_group = self.create_texture_bind_group(gpu, texture);
            render_pass.set_bind_group(2, &texture_bind_group, &[]);

            render_pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_blocks_fit_their_slots() {
        assert!(std::mem::size_of::<CameraUniforms>() as u64 <= UNIFORM_STRIDE);
        assert!(std::mem::size_of::<ModelUniforms>() as u64 <= UNIFORM_STRIDE);
        // 16-byte alignment keeps the WGSL struct layout in step
        assert_eq!(std::mem::size_of::<CameraUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ModelUniforms>() % 16, 0);
    }

    #[test]
    fn block_sizes_round_up_to_the_alignment_limit() {
        assert_eq!(aligned_stride(128), 256);
        assert_eq!(aligned_stride(256), 256);
        assert_eq!(aligned_stride(1040), 1280);
    }

    #[test]
    fn model_uniforms_carry_the_tint() {
        let m = ModelUniforms::new(
            Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
            Color::rgba(0.25, 0.5, 0.75, 1.0),
        );
        assert_eq!(m.color, [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(m.model[3][0], 1.0);
        assert_eq!(m.model[3][1], 2.0);
    }
}
