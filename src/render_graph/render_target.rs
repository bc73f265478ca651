//! Render targets, the shared depth buffer, and the per-frame context.

use crate::camera::Camera;
use crate::gpu::GpuContext;

/// An offscreen color target.
///
/// Can be rendered to, sampled by a later pass, and read back to the CPU.
/// The render graph manages two of these internally for ping-pong chaining;
/// applications create one more to receive the final frame.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// View for render pass attachments and shader sampling.
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Create a target matching the current GPU surface dimensions.
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: gpu.width(),
            height: gpu.height(),
        }
    }

    /// Recreate the texture if the GPU surface size changed.
    pub fn ensure_size(&mut self, gpu: &GpuContext, label: &str) {
        if self.width != gpu.width() || self.height != gpu.height() {
            *self = Self::new(gpu, label);
        }
    }

    /// Copy the target's pixels back to the CPU as tightly packed RGBA rows.
    ///
    /// Blocks until the GPU finishes. Intended for demos, golden-image checks,
    /// and debugging, not for per-frame use.
    pub fn read_pixels(&self, gpu: &GpuContext) -> Vec<u8> {
        let bytes_per_row = padded_bytes_per_row(self.width);
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: bytes_per_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = std::sync::mpsc::channel();
        buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).ok();
            });
        let _ = gpu.device.poll(wgpu::PollType::Wait);
        rx.recv()
            .expect("readback channel closed")
            .expect("failed to map readback buffer");

        let mapped = buffer.slice(..).get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in mapped.chunks(bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..(self.width * 4) as usize]);
        }
        drop(mapped);
        buffer.unmap();
        pixels
    }
}

/// Row stride for texture-to-buffer copies, per wgpu's 256-byte rule.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// The depth buffer shared by the scene pass and the projector passes.
///
/// The scene pass clears and writes it; the projector passes test against it
/// read-only, which is what keeps projected textures glued to visible surfaces.
pub struct DepthBuffer {
    /// The underlying depth texture.
    pub texture: wgpu::Texture,
    /// View for render pass depth attachments.
    pub view: wgpu::TextureView,
    size: (u32, u32),
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(gpu: &GpuContext) -> Self {
        let (texture, view) = Self::create(gpu);
        Self {
            texture,
            view,
            size: (gpu.width(), gpu.height()),
        }
    }

    fn create(gpu: &GpuContext) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Buffer"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreate the depth texture if the GPU surface size changed.
    pub fn ensure_size(&mut self, gpu: &GpuContext) {
        if self.size != (gpu.width(), gpu.height()) {
            let (texture, view) = Self::create(gpu);
            self.texture = texture;
            self.view = view;
            self.size = (gpu.width(), gpu.height());
        }
    }
}

/// Execution context passed to each render node during graph traversal.
///
/// Bundles everything a node needs for one frame. The `'a` lifetime ties the
/// references to the frame's scope.
pub struct RenderContext<'a> {
    /// GPU context providing device and queue access.
    pub gpu: &'a GpuContext,
    /// Command encoder the nodes append their passes to.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Elapsed time in seconds; drives tile animation.
    pub time: f32,
    /// The viewer camera.
    pub camera: &'a Camera,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_padding_rounds_up_to_256() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(800), 3328);
    }
}
