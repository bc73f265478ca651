//! Render nodes hosting the projector passes.
//!
//! Both nodes composite their input (the rendered scene) as the background,
//! then overlay the projected textures depth-tested against the shared
//! [`DepthBuffer`]. Place them after the [`MeshNode`](crate::MeshNode) that
//! renders the receiving geometry — the depth buffer is loaded, not cleared,
//! so the projections land exactly on the surfaces the scene pass drew.

use std::cell::RefCell;
use std::rc::Rc;

use crate::blit::Blitter;
use crate::gpu::GpuContext;
use crate::layered_pass::LayeredProjectorPass;
use crate::projector::{ProjectorSet, TileAnimation};
use crate::projector_pass::{DepthBias, ProjectorDraw, ProjectorPass};
use crate::render_graph::{DepthBuffer, MeshQueue, RenderContext, RenderNode};

fn clear_target(ctx: &mut RenderContext, target: &wgpu::TextureView, label: &str) {
    let _pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
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
}

fn collect_draws(queue: &MeshQueue) -> Vec<ProjectorDraw<'_>> {
    queue
        .draw_queue
        .iter()
        .filter_map(|q| {
            queue.meshes.get(q.mesh.0).map(|mesh| ProjectorDraw {
                id: q.mesh,
                mesh,
                transform: q.transform,
            })
        })
        .collect()
}

/// Render node for the animated [`ProjectorPass`].
pub struct ProjectorNode {
    /// The projector rendering pass.
    pub pass: ProjectorPass,
    /// The projectors to render, in draw order.
    pub set: Rc<RefCell<ProjectorSet>>,
    /// The frame's receiving geometry and the texture registry.
    pub queue: Rc<RefCell<MeshQueue>>,
    /// Depth buffer written by the scene pass.
    pub depth: Rc<RefCell<DepthBuffer>>,
    blitter: Blitter,
}

impl ProjectorNode {
    pub fn new(
        gpu: &GpuContext,
        set: Rc<RefCell<ProjectorSet>>,
        queue: Rc<RefCell<MeshQueue>>,
        depth: Rc<RefCell<DepthBuffer>>,
        tile_animation: TileAnimation,
    ) -> Self {
        Self {
            pass: ProjectorPass::new(gpu, tile_animation),
            set,
            queue,
            depth,
            blitter: Blitter::new(gpu),
        }
    }

    /// Override the depth bias baked into the pass pipelines.
    pub fn with_depth_bias(
        gpu: &GpuContext,
        set: Rc<RefCell<ProjectorSet>>,
        queue: Rc<RefCell<MeshQueue>>,
        depth: Rc<RefCell<DepthBuffer>>,
        tile_animation: TileAnimation,
        bias: DepthBias,
    ) -> Self {
        Self {
            pass: ProjectorPass::with_depth_bias(gpu, tile_animation, bias),
            set,
            queue,
            depth,
            blitter: Blitter::new(gpu),
        }
    }
}

impl RenderNode for ProjectorNode {
    fn prepare(&mut self, gpu: &GpuContext) {
        self.depth.borrow_mut().ensure_size(gpu);
    }

    fn execute(
        &mut self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let set = self.set.borrow();
        let queue = self.queue.borrow();
        let depth = self.depth.borrow();
        let draws = collect_draws(&queue);

        if let Some(input_view) = input {
            let mut blit_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Projector Blit Pass"),
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
            self.blitter.blit(ctx.gpu, &mut blit_pass, input_view);
        }

        if set.is_empty() || draws.is_empty() {
            if input.is_none() {
                clear_target(ctx, target, "Projector Clear Pass");
            }
            return;
        }

        let load_op = if input.is_some() {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        };

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Projector Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            // Load, never clear: this is the scene pass's depth
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.pass.render(
            ctx.gpu,
            &mut render_pass,
            ctx.camera,
            ctx.time,
            &set,
            &draws,
            &queue.textures,
        );
    }
}

/// Render node for the batched [`LayeredProjectorPass`].
pub struct LayeredProjectorNode {
    /// The layered rendering pass.
    pub pass: LayeredProjectorPass,
    /// The projectors to render, in draw order.
    pub set: Rc<RefCell<ProjectorSet>>,
    /// The frame's receiving geometry and the texture registry.
    pub queue: Rc<RefCell<MeshQueue>>,
    /// Depth buffer written by the scene pass.
    pub depth: Rc<RefCell<DepthBuffer>>,
    blitter: Blitter,
}

impl LayeredProjectorNode {
    pub fn new(
        gpu: &GpuContext,
        set: Rc<RefCell<ProjectorSet>>,
        queue: Rc<RefCell<MeshQueue>>,
        depth: Rc<RefCell<DepthBuffer>>,
    ) -> Self {
        Self {
            pass: LayeredProjectorPass::new(gpu),
            set,
            queue,
            depth,
            blitter: Blitter::new(gpu),
        }
    }

    /// Restrict the pass to a geometry subset.
    pub fn with_target(mut self, meshes: Vec<crate::ecs::MeshId>) -> Self {
        self.pass.target = Some(meshes);
        self
    }
}

impl RenderNode for LayeredProjectorNode {
    fn prepare(&mut self, gpu: &GpuContext) {
        self.depth.borrow_mut().ensure_size(gpu);
    }

    fn execute(
        &mut self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let set = self.set.borrow();
        let queue = self.queue.borrow();
        let depth = self.depth.borrow();
        let draws = collect_draws(&queue);

        if let Some(input_view) = input {
            let mut blit_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Layered Blit Pass"),
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
            self.blitter.blit(ctx.gpu, &mut blit_pass, input_view);
        }

        if set.is_empty() || draws.is_empty() {
            if input.is_none() {
                clear_target(ctx, target, "Layered Clear Pass");
            }
            return;
        }

        let load_op = if input.is_some() {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        };

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Layered Render Pass"),
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
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.pass.render(
            ctx.gpu,
            &mut render_pass,
            ctx.camera,
            ctx.time,
            &set,
            &draws,
            &queue.textures,
        );
    }
}
