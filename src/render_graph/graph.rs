//! The main render graph and builder for composing render pipelines.

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::render_graph::{RenderContext, RenderNode, RenderTarget};

/// Builder for constructing render graphs with a fluent API.
///
/// Nodes execute in insertion order. The first node receives no input; each
/// subsequent node receives the previous node's output; the final node writes
/// the caller-supplied target.
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(MeshNode::new(&gpu, queue.clone(), depth.clone()))
///     .node(ProjectorNode::new(&gpu, set, queue, depth, TileAnimation::STATIC))
///     .build(&gpu);
/// ```
pub struct RenderGraphBuilder {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a render node. Any type implementing [`RenderNode`] works.
    pub fn node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    /// Finalize the graph, allocating the intermediate ping-pong targets.
    pub fn build(self, gpu: &GpuContext) -> RenderGraph {
        let target_a = RenderTarget::new(gpu, "RenderGraph Target A");
        let target_b = RenderTarget::new(gpu, "RenderGraph Target B");

        RenderGraph {
            nodes: self.nodes,
            target_a,
            target_b,
        }
    }
}

impl Default for RenderGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A composable render graph executing a chain of render passes.
///
/// For multi-node graphs, two intermediate render targets are used as
/// ping-pong buffers:
///
/// ```text
/// Node 0: None → Target A
/// Node 1: Target A → Target B
/// Node 2: Target B → output
/// ```
///
/// Single-node graphs render straight into the output. The graph is invoked
/// once per frame, synchronously, on the calling thread.
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
    target_a: RenderTarget,
    target_b: RenderTarget,
}

impl RenderGraph {
    /// Start building a render graph.
    pub fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new()
    }

    /// Add a node to an existing graph.
    pub fn with_node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    /// Execute the graph for one frame, writing the final node's output into
    /// `target`.
    ///
    /// Calls every node's [`prepare`](RenderNode::prepare) hook, resizes the
    /// intermediate targets if needed, then records and submits the whole
    /// frame as a single command buffer.
    pub fn execute(
        &mut self,
        gpu: &GpuContext,
        time: f32,
        camera: &Camera,
        target: &wgpu::TextureView,
    ) {
        for node in &mut self.nodes {
            node.prepare(gpu);
        }

        self.target_a.ensure_size(gpu, "RenderGraph Target A");
        self.target_b.ensure_size(gpu, "RenderGraph Target B");

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("RenderGraph Encoder"),
            });

        let node_count = self.nodes.len();

        {
            let mut ctx = RenderContext {
                gpu,
                encoder: &mut encoder,
                time,
                camera,
            };

            if node_count == 1 {
                self.nodes[0].execute(&mut ctx, target, None);
            } else {
                // Ping-pong between intermediate targets; last node hits `target`
                let mut current_input: Option<&wgpu::TextureView> = None;

                for (i, node) in self.nodes.iter_mut().enumerate() {
                    let is_last = i == node_count - 1;

                    let node_target = if is_last {
                        target
                    } else if i % 2 == 0 {
                        &self.target_a.view
                    } else {
                        &self.target_b.view
                    };

                    node.execute(&mut ctx, node_target, current_input);

                    if !is_last {
                        current_input = Some(if i % 2 == 0 {
                            &self.target_a.view
                        } else {
                            &self.target_b.view
                        });
                    }
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}
