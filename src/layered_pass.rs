//! The layered projector pass: many projectors per draw.
//!
//! Where [`ProjectorPass`](crate::ProjectorPass) issues one draw per projector,
//! this pass packs up to [`MAX_LAYERS`] projectors into a single uniform block
//! and resolves their combine modes inside the shader, so `n` projectors cost
//! `ceil(n / 8)` passes over the receiving geometry. Use it for stacks of static
//! overlapping projections — blood decals, overlapping light gobos, team logos.
//!
//! Layers within a batch composite in list order; each batch alpha-blends its
//! accumulated result over the scene. The geometry target is a property of the
//! pass as a whole, not of individual projectors.

use bytemuck::Zeroable;

use crate::camera::Camera;
use crate::color::Color;
use crate::ecs::MeshId;
use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::mesh_pass::{CameraUniforms, ModelUniforms, SlotBuffer};
use crate::projector::{Projector, ProjectorSet};
use crate::projector_pass::{DepthBias, ProjectorDraw};
use crate::render_graph::DepthBuffer;
use crate::texture::Texture;

/// Maximum projectors batched into one draw.
pub const MAX_LAYERS: usize = 8;

/// Passes needed to render `n` projectors.
pub(crate) fn batch_count(n: usize) -> usize {
    n.div_ceil(MAX_LAYERS)
}

/// One projector's parameters inside a batch.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LayerSlot {
    pub texture_matrix: [[f32; 4]; 4],
    /// Projector location; w = 1 for perspective, 0 for parallel.
    pub location: [f32; 4],
    /// Projection direction; w = 1 when falloff is enabled.
    pub direction: [f32; 4],
    /// Falloff distance, falloff power, then padding.
    pub falloff: [f32; 4],
    /// Combine mode index, then padding.
    pub mode: [u32; 4],
}

impl LayerSlot {
    fn pack(projector: &Projector) -> Self {
        let location = projector.location();
        let direction = projector.direction();
        let (distance, power) = match projector.falloff {
            Some(f) => (f.distance, f.power),
            None => (0.0, 1.0),
        };
        Self {
            texture_matrix: projector.texture_matrix().to_cols_array_2d(),
            location: [
                location.x,
                location.y,
                location.z,
                if projector.is_parallel() { 0.0 } else { 1.0 },
            ],
            direction: [
                direction.x,
                direction.y,
                direction.z,
                if projector.falloff.is_some() { 1.0 } else { 0.0 },
            ],
            falloff: [distance, power, 0.0, 0.0],
            mode: [projector.combine.shader_index(), 0, 0, 0],
        }
    }
}

/// The uniform block for one batch of projectors.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LayerBatchUniforms {
    /// Live layer count in x; the rest is padding.
    pub count: [u32; 4],
    pub slots: [LayerSlot; MAX_LAYERS],
}

impl LayerBatchUniforms {
    pub(crate) fn pack(chunk: &[Projector]) -> Self {
        debug_assert!(chunk.len() <= MAX_LAYERS);
        let mut slots = [LayerSlot::zeroed(); MAX_LAYERS];
        for (slot, projector) in slots.iter_mut().zip(chunk) {
            *slot = LayerSlot::pack(projector);
        }
        Self {
            count: [chunk.len() as u32, 0, 0, 0],
            slots,
        }
    }
}

/// Renders a [`ProjectorSet`] in batches of up to [`MAX_LAYERS`].
///
/// Bind groups: 0 = camera, 1 = batch parameters (dynamic offset), 2 = the
/// batch's projective maps + shared sampler, 3 = model (dynamic offset).
pub struct LayeredProjectorPass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    batch_layout: wgpu::BindGroupLayout,
    batches: SlotBuffer,
    model_layout: wgpu::BindGroupLayout,
    models: SlotBuffer,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    empty_texture: Texture,
    /// Restrict the whole pass to these meshes. `None` projects onto everything
    /// queued this frame.
    pub target: Option<Vec<MeshId>>,
}

impl LayeredProjectorPass {
    /// Create the pass with the default [`DepthBias`].
    pub fn new(gpu: &GpuContext) -> Self {
        Self::with_depth_bias(gpu, DepthBias::default())
    }

    /// Create the pass with an explicit depth bias, baked into the pipeline.
    pub fn with_depth_bias(gpu: &GpuContext, depth_bias: DepthBias) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Layered Projector Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/projector_layered.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layered Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layered Camera Bind Group Layout"),
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
            label: Some("Layered Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let batch_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layer Batch Bind Group Layout"),
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
        let batches = SlotBuffer::with_block_size(
            device,
            &batch_layout,
            "Layer Batch Slots",
            4,
            std::mem::size_of::<LayerBatchUniforms>() as u64,
        );

        // Eight texture slots plus one shared sampler
        let mut texture_entries = Vec::with_capacity(MAX_LAYERS + 1);
        for binding in 0..MAX_LAYERS as u32 {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: MAX_LAYERS as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Layered Map Bind Group Layout"),
                entries: &texture_entries,
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Layered Map Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layered Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let models = SlotBuffer::new(device, &model_layout, "Layered Model Slots", 64);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Layered Projector Pipeline Layout"),
            bind_group_layouts: &[
                &camera_layout,
                &batch_layout,
                &texture_bind_group_layout,
                &model_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Layered Projector Pipeline"),
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
                    // The shader accumulates premultiplied color
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
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
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: depth_bias.state(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let empty_texture = Texture::from_rgba(gpu, &[0, 0, 0, 0], 1, 1, "Empty Layer Texture");

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            batch_layout,
            batches,
            model_layout,
            models,
            texture_bind_group_layout,
            sampler,
            empty_texture,
            target: None,
        }
    }

    fn create_texture_bind_group(
        &self,
        gpu: &GpuContext,
        chunk: &[Projector],
        textures: &[Texture],
    ) -> wgpu::BindGroup {
        let mut entries = Vec::with_capacity(MAX_LAYERS + 1);
        for slot in 0..MAX_LAYERS {
            let view = chunk
                .get(slot)
                .and_then(|p| textures.get(p.texture.0))
                .map(|t| &t.view)
                .unwrap_or(&self.empty_texture.view);
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_LAYERS as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Layered Map Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &entries,
        })
    }

    /// Render every projector in `set`, batched in list order.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        camera: &Camera,
        time: f32,
        set: &ProjectorSet,
        draws: &[ProjectorDraw],
        textures: &[Texture],
    ) {
        if set.is_empty() || draws.is_empty() {
            return;
        }

        let batch_total = batch_count(set.len()) as u32;
        self.batches
            .ensure(&gpu.device, &self.batch_layout, batch_total);
        self.models
            .ensure(&gpu.device, &self.model_layout, draws.len() as u32);

        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms::new(camera, time)),
        );

        for (i, draw) in draws.iter().enumerate() {
            self.models.write(
                &gpu.queue,
                i as u32,
                &ModelUniforms::new(draw.transform, Color::WHITE),
            );
        }

        log::trace!(
            "layered pass: {} projectors in {} batches",
            set.len(),
            batch_total
        );

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (bi, chunk) in set.projectors().chunks(MAX_LAYERS).enumerate() {
            self.batches
                .write(&gpu.queue, bi as u32, &LayerBatchUniforms::pack(chunk));
            render_pass.set_bind_group(1, &self.batches.bind_group, &[
                self.batches.offset(bi as u32)
            ]);

            let texture_bind_group = self.create_texture_bind_group(gpu, chunk, textures);
            render_pass.set_bind_group(2, &texture_bind_group, &[]);

            for (di, draw) in draws.iter().enumerate() {
                if let Some(target) = &self.target {
                    if !target.contains(&draw.id) {
                        continue;
                    }
                }
                render_pass.set_bind_group(
                    3,
                    &self.models.bind_group,
                    &[self.models.offset(di as u32)],
                );
                render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::TextureId;
    use crate::projector::{CombineMode, Falloff};
    use glam::Vec3;

    fn projector(texture: usize) -> Projector {
        Projector::new(
            Camera::new()
                .at(Vec3::new(1.0, 2.1, 0.0))
                .looking_at(Vec3::ZERO)
                .perspective(45.0, 1.0, 1.0, 5.0),
            TextureId(texture),
        )
    }

    #[test]
    fn batches_of_eight() {
        assert_eq!(batch_count(0), 0);
        assert_eq!(batch_count(1), 1);
        assert_eq!(batch_count(8), 1);
        assert_eq!(batch_count(9), 2);
        assert_eq!(batch_count(17), 3);
    }

    #[test]
    fn uniform_block_layout_matches_the_shader() {
        assert_eq!(std::mem::size_of::<LayerSlot>(), 128);
        assert_eq!(
            std::mem::size_of::<LayerBatchUniforms>(),
            16 + MAX_LAYERS * 128
        );
    }

    #[test]
    fn pack_records_count_and_modes() {
        let chunk = vec![
            projector(0).with_combine(CombineMode::BlendAddAlpha),
            projector(1).with_falloff(Falloff::new(2.1, 4.0)),
        ];
        let batch = LayerBatchUniforms::pack(&chunk);
        assert_eq!(batch.count[0], 2);
        assert_eq!(batch.slots[0].mode[0], CombineMode::BlendAddAlpha.shader_index());
        assert_eq!(batch.slots[1].falloff[0], 2.1);
        assert_eq!(batch.slots[1].direction[3], 1.0);
        // Unused slots stay zeroed
        assert_eq!(batch.slots[2].location, [0.0; 4]);
    }
}
