//! # Gobo
//!
//! **Projective texture mapping for wgpu scenes.**
//!
//! Project animated or layered textures onto scene geometry from virtual projector
//! cameras — slide-projector logos, spotlight gobos, caustic sprites, fake decals.
//! Each projector is a camera (perspective or parallel) paired with a texture; once
//! per frame the projector passes re-render the receiving geometry with a projective
//! material and composite the result over the scene.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use gobo::*;
//!
//! fn main() {
//!     let gpu = GpuContext::headless(800, 600);
//!
//!     let queue = Rc::new(RefCell::new(MeshQueue::new()));
//!     let ground = queue.borrow_mut().add_mesh(Mesh::plane(&gpu, 20.0));
//!     let spot = queue.borrow_mut().add_texture(Texture::radial_spot(&gpu, 256, Color::WHITE));
//!
//!     let projectors = Rc::new(RefCell::new(ProjectorSet::new()));
//!     projectors.borrow_mut().add(Projector::new(
//!         Camera::new()
//!             .at(Vec3::new(0.0, 4.0, 0.0))
//!             .looking_in(Vec3::NEG_Y)
//!             .with_up(Vec3::X)
//!             .perspective(45.0, 1.0, 1.0, 10.0),
//!         spot,
//!     ));
//!
//!     let depth = Rc::new(RefCell::new(DepthBuffer::new(&gpu)));
//!     let mut graph = RenderGraph::builder()
//!         .node(MeshNode::new(&gpu, Rc::clone(&queue), Rc::clone(&depth)))
//!         .node(ProjectorNode::new(
//!             &gpu,
//!             Rc::clone(&projectors),
//!             Rc::clone(&queue),
//!             Rc::clone(&depth),
//!             TileAnimation::STATIC,
//!         ))
//!         .build(&gpu);
//!
//!     let camera = Camera::new()
//!         .at(Vec3::new(-3.0, 3.0, -3.0))
//!         .looking_at(Vec3::ZERO)
//!         .perspective(45.0, gpu.aspect(), 0.1, 1000.0);
//!
//!     let output = RenderTarget::new(&gpu, "Output");
//!     queue.borrow_mut().draw(ground, Transform::new(), Color::WHITE);
//!     graph.execute(&gpu, 0.0, &camera, &output.view);
//!     queue.borrow_mut().clear_queue();
//! }
//! ```
//!
//! ## Design
//!
//! - **Projectors are data** — a [`Projector`] is a config record: camera, texture
//!   handle, optional falloff, combine mode, optional geometry subset. The list order
//!   inside a [`ProjectorSet`] is the draw order.
//! - **Passes are the material override** — [`ProjectorPass`] and
//!   [`LayeredProjectorPass`] re-render receiving geometry with their own pipelines,
//!   the Rust analogue of temporarily forcing a projective material on the scene.
//! - **Headless by default** — the crate renders into offscreen targets and reads
//!   pixels back; presentation belongs to the host application.

mod blit;
mod camera;
mod color;
mod ecs;
mod gpu;
mod layered_pass;
mod mesh;
mod mesh_pass;
mod projector;
mod projector_pass;
mod render_graph;
mod texture;

pub use camera::{Camera, Projection};
pub use color::Color;
pub use ecs::{MeshId, ProjectorId, RenderMesh, RenderProjector, TextureId};
pub use gpu::GpuContext;
pub use layered_pass::{LayeredProjectorPass, MAX_LAYERS};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use mesh_pass::{DrawCall, MeshPass};
pub use projector::{CombineMode, Falloff, Projector, ProjectorSet, TileAnimation};
pub use projector_pass::{DepthBias, ProjectorDraw, ProjectorPass};
pub use render_graph::{
    DepthBuffer, LayeredProjectorNode, MeshNode, MeshQueue, ProjectorNode, QueuedMesh,
    RenderContext, RenderGraph, RenderGraphBuilder, RenderNode, RenderTarget,
};
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

// ECS support
pub use hecs::{Entity, World};
