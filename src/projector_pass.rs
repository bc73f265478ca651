//! The animated projector pass.
//!
//! Re-renders receiving geometry once per projector with a projective material:
//! the projector's texture matrix maps each fragment into the map, the selected
//! animation tile picks the atlas cell, and falloff attenuates with distance.
//! Draw order follows the projector list order, and each projector draws either
//! its target subset or every queued mesh.
//!
//! Binding the pass's pipeline *is* the material override — the scene's own
//! materials are untouched, and the projected layers composite over the already
//! rendered frame through each projector's [`CombineMode`].

use glam::Vec3;

use crate::camera::Camera;
use crate::color::Color;
use crate::ecs::MeshId;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::mesh_pass::{CameraUniforms, ModelUniforms, SlotBuffer};
use crate::projector::{CombineMode, Projector, ProjectorSet, TileAnimation};
use crate::render_graph::DepthBuffer;
use crate::texture::Texture;

/// Depth bias applied while re-rendering receiving geometry.
///
/// The projected layer draws the same triangles the scene pass already drew, so
/// without a bias the depth test becomes a coin flip and the projection
/// stitches. Negative values pull the layer slightly toward the viewer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthBias {
    /// Constant bias in depth-buffer units.
    pub constant: i32,
    /// Bias scaling with the polygon's depth slope.
    pub slope_scale: f32,
}

impl Default for DepthBias {
    fn default() -> Self {
        Self {
            constant: -1,
            slope_scale: -0.1,
        }
    }
}

impl DepthBias {
    pub(crate) fn state(self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.constant,
            slope_scale: self.slope_scale,
            clamp: 0.0,
        }
    }
}

/// Per-projector parameters uploaded before each projector's draws.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ProjectorUniforms {
    /// World space to projective texture space.
    pub texture_matrix: [[f32; 4]; 4],
    /// Projector location; w = 1 for perspective, 0 for parallel.
    pub location: [f32; 4],
    /// Projection direction; w = 1 when falloff is enabled.
    pub direction: [f32; 4],
    /// tiles_u, tiles_v, selected_u, selected_v.
    pub tiles: [u32; 4],
    /// Falloff distance and power.
    pub falloff: [f32; 2],
    /// Combine mode index (the shader pre-mixes for Multiply).
    pub mode: u32,
    pub _pad: u32,
}

impl ProjectorUniforms {
    pub(crate) fn pack(
        projector: &Projector,
        animation: &TileAnimation,
        selected: (u32, u32),
    ) -> Self {
        let location: Vec3 = projector.location();
        let direction: Vec3 = projector.direction();
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
            tiles: [animation.tiles_u, animation.tiles_v, selected.0, selected.1],
            falloff: [distance, power],
            mode: projector.combine.shader_index(),
            _pad: 0,
        }
    }
}

/// A receiving-geometry draw prepared by the graph node: the queued mesh, its
/// handle for target filtering, and its world transform.
pub struct ProjectorDraw<'a> {
    pub id: MeshId,
    pub mesh: &'a Mesh,
    pub transform: Transform,
}

/// Renders a [`ProjectorSet`] with tile animation.
///
/// Bind groups: 0 = camera, 1 = projector parameters (dynamic offset),
/// 2 = projective map + sampler, 3 = model (dynamic offset). One pipeline per
/// [`CombineMode`]; depth is tested read-only against the scene depth buffer
/// with a configurable [`DepthBias`].
pub struct ProjectorPass {
    pipelines: [wgpu::RenderPipeline; 4],
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    projector_layout: wgpu::BindGroupLayout,
    projectors: SlotBuffer,
    model_layout: wgpu::BindGroupLayout,
    models: SlotBuffer,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    /// Tile-atlas animation applied to every projector in this pass.
    pub tile_animation: TileAnimation,
}

impl ProjectorPass {
    /// Create the pass with the default [`DepthBias`].
    pub fn new(gpu: &GpuContext, tile_animation: TileAnimation) -> Self {
        Self::with_depth_bias(gpu, tile_animation, DepthBias::default())
    }

    /// Create the pass with an explicit depth bias. The bias is baked into the
    /// pipelines, so it is fixed for the lifetime of the pass.
    pub fn with_depth_bias(
        gpu: &GpuContext,
        tile_animation: TileAnimation,
        depth_bias: DepthBias,
    ) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Projector Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/projector.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Projector Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Projector Camera Bind Group Layout"),
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
            label: Some("Projector Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let projector_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Projector Params Bind Group Layout"),
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
        let projectors = SlotBuffer::new(device, &projector_layout, "Projector Param Slots", 8);

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Projective Map Bind Group Layout"),
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

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Projector Model Bind Group Layout"),
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
        let models = SlotBuffer::new(device, &model_layout, "Projector Model Slots", 64);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Projector Pipeline Layout"),
            bind_group_layouts: &[
                &camera_layout,
                &projector_layout,
                &texture_bind_group_layout,
                &model_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipelines = CombineMode::ALL.map(|mode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Projector Pipeline"),
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
                        blend: Some(mode.blend_state()),
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
            })
        });

        Self {
            pipelines,
            camera_buffer,
            camera_bind_group,
            projector_layout,
            projectors,
            model_layout,
            models,
            texture_bind_group_layout,
            tile_animation,
        }
    }

    fn create_texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Projective Map Bind Group"),
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

    /// Render every projector in `set`, in list order.
    ///
    /// `draws` is the frame's receiving geometry; `textures` is the registry the
    /// projectors' texture handles index into. Projectors whose handle does not
    /// resolve are skipped with a warning.
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

        self.projectors
            .ensure(&gpu.device, &self.projector_layout, set.len() as u32);
        self.models
            .ensure(&gpu.device, &self.model_layout, draws.len() as u32);

        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms::new(camera, time)),
        );

        // The transforms are shared by every projector, so the model slots are
        // written once per queued mesh.
        for (i, draw) in draws.iter().enumerate() {
            self.models.write(
                &gpu.queue,
                i as u32,
                &ModelUniforms::new(draw.transform, Color::WHITE),
            );
        }

        let selected = self.tile_animation.select(time);
        log::trace!(
            "projector pass: {} projectors, tile ({}, {})",
            set.len(),
            selected.0,
            selected.1
        );

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (pi, projector) in set.projectors().iter().enumerate() {
            let Some(texture) = textures.get(projector.texture.0) else {
                log::warn!("projector {} references an unknown texture", pi);
                continue;
            };

            self.projectors.write(
                &gpu.queue,
                pi as u32,
                &ProjectorUniforms::pack(projector, &self.tile_animation, selected),
            );

            render_pass.set_pipeline(&self.pipelines[projector.combine.shader_index() as usize]);
            render_pass.set_bind_group(
                1,
                &self.projectors.bind_group,
                &[self.projectors.offset(pi as u32)],
            );

            let texture_bind_group = self.create_texture_bind_group(gpu, texture);
            render_pass.set_bind_group(2, &texture_bind_group, &[]);

            for (di, draw) in draws.iter().enumerate() {
                if let Some(target) = &projector.target {
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
    use crate::camera::Camera;
    use crate::ecs::TextureId;
    use crate::mesh_pass::UNIFORM_STRIDE;
    use crate::projector::Falloff;

    fn perspective_projector() -> Projector {
        Projector::new(
            Camera::new()
                .at(Vec3::new(1.0, 2.1, 0.0))
                .looking_at(Vec3::ZERO)
                .perspective(45.0, 1.0, 1.0, 5.0),
            TextureId(2),
        )
    }

    #[test]
    fn uniforms_fit_a_slot_and_stay_aligned() {
        assert!(std::mem::size_of::<ProjectorUniforms>() as u64 <= UNIFORM_STRIDE);
        assert_eq!(std::mem::size_of::<ProjectorUniforms>() % 16, 0);
    }

    #[test]
    fn pack_flags_perspective_and_falloff() {
        let anim = TileAnimation::new(6, 1, 20.0);
        let p = perspective_projector().with_falloff(Falloff::new(2.1, 4.0));
        let u = ProjectorUniforms::pack(&p, &anim, (3, 0));
        assert_eq!(u.location[3], 1.0);
        assert_eq!(u.direction[3], 1.0);
        assert_eq!(u.falloff, [2.1, 4.0]);
        assert_eq!(u.tiles, [6, 1, 3, 0]);
    }

    #[test]
    fn pack_flags_parallel_without_falloff() {
        let p = Projector::new(
            Camera::new()
                .at(Vec3::new(0.0, 3.0, 0.0))
                .looking_in(Vec3::NEG_Y)
                .with_up(Vec3::X)
                .parallel(1.5, 1.5, 1.0, 5.0),
            TextureId(0),
        );
        let u = ProjectorUniforms::pack(&p, &TileAnimation::STATIC, (0, 0));
        assert_eq!(u.location[3], 0.0);
        assert_eq!(u.direction[3], 0.0);
        // Direction still rides along for parallel attenuation math
        assert!((u.direction[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_depth_bias_pulls_toward_viewer() {
        let bias = DepthBias::default();
        assert!(bias.constant < 0);
        assert!(bias.slope_scale < 0.0);
    }
}
