//! Shared mesh/texture registry and the scene render node.

use std::cell::RefCell;
use std::rc::Rc;

use crate::color::Color;
use crate::ecs::{MeshId, RenderMesh, TextureId};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform};
use crate::mesh_pass::{DrawCall, MeshPass};
use crate::render_graph::{DepthBuffer, RenderContext, RenderNode};
use crate::texture::Texture;

/// A queued mesh draw call.
pub struct QueuedMesh {
    /// Handle to the mesh geometry.
    pub mesh: MeshId,
    /// World-space transformation for this instance.
    pub transform: Transform,
    /// Color tint multiplied with the surface texture.
    pub color: Color,
    /// Optional surface texture handle.
    pub texture: Option<TextureId>,
}

/// Shared storage for meshes, textures, and the per-frame draw queue.
///
/// The queue is the single registry both the scene pass and the projector
/// passes pull from: queued meshes are the scene geometry *and* the receiving
/// surfaces for projection, and registered textures serve as surface maps and
/// projective maps alike. Typically wrapped in `Rc<RefCell<…>>` and shared
/// between the render graph nodes and application code.
pub struct MeshQueue {
    /// Registered meshes, indexed by [`MeshId`].
    pub meshes: Vec<Mesh>,
    /// Registered textures, indexed by [`TextureId`].
    pub textures: Vec<Texture>,
    /// Per-frame draw queue, cleared at the end of each frame.
    pub draw_queue: Vec<QueuedMesh>,
}

impl MeshQueue {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            textures: Vec::new(),
            draw_queue: Vec::new(),
        }
    }

    /// Register a mesh and return its handle.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let idx = self.meshes.len();
        self.meshes.push(mesh);
        MeshId(idx)
    }

    /// Register a texture and return its handle.
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let idx = self.textures.len();
        self.textures.push(texture);
        TextureId(idx)
    }

    /// Queue an untextured mesh for this frame.
    pub fn draw(&mut self, mesh: MeshId, transform: Transform, color: Color) {
        self.draw_queue.push(QueuedMesh {
            mesh,
            transform,
            color,
            texture: None,
        });
    }

    /// Queue a textured mesh for this frame.
    pub fn draw_textured(
        &mut self,
        mesh: MeshId,
        transform: Transform,
        color: Color,
        texture: TextureId,
    ) {
        self.draw_queue.push(QueuedMesh {
            mesh,
            transform,
            color,
            texture: Some(texture),
        });
    }

    /// Queue every entity carrying a [`Transform`] and a [`RenderMesh`].
    pub fn queue_world(&mut self, world: &hecs::World) {
        let mut query = world.query::<(&Transform, &RenderMesh)>();
        for (_entity, (transform, render)) in query.iter() {
            self.draw_queue.push(QueuedMesh {
                mesh: render.mesh,
                transform: *transform,
                color: render.color,
                texture: render.texture,
            });
        }
    }

    /// Clear the draw queue for the next frame. Registered meshes and textures
    /// are preserved.
    pub fn clear_queue(&mut self) {
        self.draw_queue.clear();
    }
}

impl Default for MeshQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Render node for the base scene: draws every queued mesh with depth testing.
///
/// Writes the shared [`DepthBuffer`], which the projector nodes later test
/// against. When the node has an input (a previous pass's output), that input
/// is blitted as the background first; otherwise the target is cleared to
/// [`clear_color`](Self::clear_color).
pub struct MeshNode {
    /// The scene rendering pass.
    pub pass: MeshPass,
    /// Shared mesh/texture registry and draw queue.
    pub queue: Rc<RefCell<MeshQueue>>,
    /// Depth buffer shared with the projector nodes.
    pub depth: Rc<RefCell<DepthBuffer>>,
    /// Clear color when there is no input to composite.
    pub clear_color: wgpu::Color,
}

impl MeshNode {
    pub fn new(
        gpu: &GpuContext,
        queue: Rc<RefCell<MeshQueue>>,
        depth: Rc<RefCell<DepthBuffer>>,
    ) -> Self {
        Self {
            pass: MeshPass::new(gpu),
            queue,
            depth,
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Set the clear color used when the node is first in the graph.
    pub fn with_clear(mut self, color: Color) -> Self {
        self.clear_color = color.to_wgpu();
        self
    }
}

impl RenderNode for MeshNode {
    fn prepare(&mut self, gpu: &GpuContext) {
        self.depth.borrow_mut().ensure_size(gpu);
    }

    fn execute(
        &mut self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let queue = self.queue.borrow();
        let depth = self.depth.borrow();

        let draw_calls: Vec<DrawCall> = queue
            .draw_queue
            .iter()
            .filter_map(|q| {
                queue.meshes.get(q.mesh.0).map(|mesh| DrawCall {
                    mesh,
                    transform: q.transform,
                    color: q.color,
                    texture: q.texture.and_then(|t| queue.textures.get(t.0)),
                })
            })
            .collect();

        // Composite the previous pass's output as the background first
        if let Some(input_view) = input {
            let mut blit_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.pass.blit(ctx.gpu, &mut blit_pass, input_view);
        }

        let load_op = if input.is_some() {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(self.clear_color)
        };

        // The depth clear happens even with an empty queue so the projector
        // nodes never test against stale depth.
        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.pass
            .render(ctx.gpu, &mut render_pass, ctx.camera, ctx.time, &draw_calls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use hecs::World;

    #[test]
    fn queue_world_collects_render_meshes() {
        let mut queue = MeshQueue::new();
        let mut world = World::new();
        world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            RenderMesh::new(MeshId(0), Color::ORANGE),
        ));
        world.spawn((Transform::new(),)); // no RenderMesh, must be skipped

        queue.queue_world(&world);

        assert_eq!(queue.draw_queue.len(), 1);
        assert_eq!(queue.draw_queue[0].mesh, MeshId(0));
        assert_eq!(queue.draw_queue[0].color, Color::ORANGE);
    }

    #[test]
    fn clear_queue_keeps_registered_assets() {
        let mut queue = MeshQueue::new();
        queue.draw(MeshId(0), Transform::new(), Color::WHITE);
        assert_eq!(queue.draw_queue.len(), 1);
        queue.clear_queue();
        assert!(queue.draw_queue.is_empty());
    }
}
