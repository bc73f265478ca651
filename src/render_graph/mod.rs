//! Composable render graph for the scene + projector pipeline.
//!
//! A linear chain of render nodes with automatic ping-pong buffer management.
//! The canonical graph for this crate is two nodes long:
//!
//! ```text
//! ┌────────────┐     ┌────────────────┐
//! │  MeshNode  │ ──▶ │ ProjectorNode  │ ──▶ output target
//! │  (scene)   │     │ (projections)  │
//! └────────────┘     └────────────────┘
//!        │ writes            │ reads
//!        ▼                   ▼
//!        └──── DepthBuffer ──┘
//! ```
//!
//! The scene node writes color and depth; the projector node composites the
//! scene color as its background and overlays the projected textures, depth
//! tested against the same buffer. [`LayeredProjectorNode`] slots in the same
//! position when projectors should be batched.

mod graph;
mod mesh_queue;
mod projector_nodes;
mod render_node;
mod render_target;

pub use graph::{RenderGraph, RenderGraphBuilder};
pub use mesh_queue::{MeshNode, MeshQueue, QueuedMesh};
pub use projector_nodes::{LayeredProjectorNode, ProjectorNode};
pub use render_node::RenderNode;
pub use render_target::{DepthBuffer, RenderContext, RenderTarget};
