//! The core render node trait for the render graph.

use crate::gpu::GpuContext;
use crate::render_graph::RenderContext;

/// A scene processor hooked into the render graph.
///
/// This is the per-frame callback contract: the graph calls [`prepare`] once for
/// every node at the start of the frame, then [`execute`] in node order. Each
/// node receives the previous node's color output (if any) and writes to the
/// target view the graph hands it. Construction doubles as initialization and
/// `Drop` as cleanup, so there are no separate lifecycle hooks.
///
/// [`prepare`]: RenderNode::prepare
/// [`execute`]: RenderNode::execute
///
/// # Implementing Custom Nodes
///
/// ```ignore
/// struct VignetteNode {
///     pipeline: wgpu::RenderPipeline,
/// }
///
/// impl RenderNode for VignetteNode {
///     fn execute(
///         &mut self,
///         ctx: &mut RenderContext,
///         target: &wgpu::TextureView,
///         input: Option<&wgpu::TextureView>,
///     ) {
///         let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
///             color_attachments: &[Some(wgpu::RenderPassColorAttachment {
///                 view: target,
///                 // ...
///             })],
///             // ...
///         });
///         pass.set_pipeline(&self.pipeline);
///         pass.draw(0..3, 0..1);
///     }
/// }
/// ```
pub trait RenderNode {
    /// Called once per frame before any node executes.
    ///
    /// The place for size-dependent bookkeeping (depth buffers, intermediate
    /// targets). The default implementation does nothing.
    fn prepare(&mut self, _gpu: &GpuContext) {}

    /// Record this node's rendering for the frame.
    ///
    /// # Arguments
    ///
    /// * `ctx` - GPU access, command encoder, time, and viewer camera
    /// * `target` - Texture view to render into
    /// * `input` - Previous node's output, or `None` for the first node
    fn execute(
        &mut self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    );
}
