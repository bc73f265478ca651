//! GPU textures and procedural projective maps.
//!
//! Textures double as ordinary surface maps (bound by the scene pass) and as
//! projective maps (bound by the projector passes). Projective maps are sampled
//! with clamping, and fragments outside the projector frustum are rejected in the
//! shader, so a projected image never tiles across the scene.
//!
//! The procedural constructors ([`Texture::checkerboard`], [`Texture::radial_spot`],
//! [`Texture::tile_strip`]) generate the classic test content for projection work:
//! a surface pattern, a spotlight gobo, and a horizontal animation strip.

use crate::color::Color;
use crate::gpu::GpuContext;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Clamped so a projective map cannot repeat past its frustum edge
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &str) -> Result<Self, image::ImageError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, path))
    }

    /// Load a texture from embedded bytes.
    pub fn from_bytes(
        gpu: &GpuContext,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, label))
    }

    /// A checkerboard of `cells` x `cells` squares in two colors.
    pub fn checkerboard(gpu: &GpuContext, size: u32, cells: u32, a: Color, b: Color) -> Self {
        let data = checkerboard_pixels(size, cells, a, b);
        Self::from_rgba(gpu, &data, size, size, "Checkerboard Texture")
    }

    /// A soft circular spot fading to transparent at the edge. The standard
    /// spotlight gobo.
    pub fn radial_spot(gpu: &GpuContext, size: u32, color: Color) -> Self {
        let data = radial_spot_pixels(size, color);
        Self::from_rgba(gpu, &data, size, size, "Radial Spot Texture")
    }

    /// A horizontal strip of `tiles` animation frames, each `tile_size` pixels
    /// square. Frame `i` contains a centered disc growing from small to
    /// tile-filling, so stepping through the frames reads as a pulse.
    ///
    /// Pair with a [`TileAnimation`](crate::TileAnimation) of `tiles` columns and
    /// one row.
    pub fn tile_strip(gpu: &GpuContext, tile_size: u32, tiles: u32, color: Color) -> Self {
        let data = tile_strip_pixels(tile_size, tiles, color);
        Self::from_rgba(gpu, &data, tile_size * tiles, tile_size, "Tile Strip Texture")
    }
}

pub(crate) fn checkerboard_pixels(size: u32, cells: u32, a: Color, b: Color) -> Vec<u8> {
    let cell = (size / cells.max(1)).max(1);
    let (pa, pb) = (a.to_rgba8(), b.to_rgba8());
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            data.extend_from_slice(if even { &pa } else { &pb });
        }
    }
    data
}

pub(crate) fn radial_spot_pixels(size: u32, color: Color) -> Vec<u8> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    let center = (size as f32 - 1.0) * 0.5;
    let radius = size as f32 * 0.5;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let r = (dx * dx + dy * dy).sqrt() / radius;
            let fade = (1.0 - r * r).clamp(0.0, 1.0);
            let px = Color::rgba(color.r, color.g, color.b, color.a * fade).to_rgba8();
            data.extend_from_slice(&px);
        }
    }
    data
}

pub(crate) fn tile_strip_pixels(tile_size: u32, tiles: u32, color: Color) -> Vec<u8> {
    let width = tile_size * tiles;
    let mut data = vec![0u8; (width * tile_size * 4) as usize];
    let center = (tile_size as f32 - 1.0) * 0.5;
    let px = color.to_rgba8();
    for tile in 0..tiles {
        // Disc radius ramps from 20% to 90% of the tile across the strip
        let t = (tile as f32 + 1.0) / tiles as f32;
        let radius = tile_size as f32 * 0.5 * (0.2 + 0.7 * t);
        for y in 0..tile_size {
            for x in 0..tile_size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                if dx * dx + dy * dy <= radius * radius {
                    let idx = (((y * width) + tile * tile_size + x) * 4) as usize;
                    data[idx..idx + 4].copy_from_slice(&px);
                }
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_cells() {
        let data = checkerboard_pixels(4, 2, Color::WHITE, Color::BLACK);
        assert_eq!(data.len(), 4 * 4 * 4);
        // (0,0) is in the first cell, (2,0) in the second
        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&data[2 * 4..2 * 4 + 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn radial_spot_fades_to_transparent_corners() {
        let data = radial_spot_pixels(16, Color::WHITE);
        let center_alpha = data[(8 * 16 + 8) * 4 + 3];
        let corner_alpha = data[3];
        assert!(center_alpha > 200);
        assert_eq!(corner_alpha, 0);
    }

    #[test]
    fn tile_strip_discs_grow_across_frames() {
        let tile = 16u32;
        let tiles = 4u32;
        let data = tile_strip_pixels(tile, tiles, Color::WHITE);
        assert_eq!(data.len(), (tile * tiles * tile * 4) as usize);

        let opaque_in_tile = |i: u32| -> usize {
            let mut count = 0;
            for y in 0..tile {
                for x in 0..tile {
                    let idx = (((y * tile * tiles) + i * tile + x) * 4 + 3) as usize;
                    if data[idx] > 0 {
                        count += 1;
                    }
                }
            }
            count
        };

        assert!(opaque_in_tile(0) < opaque_in_tile(1));
        assert!(opaque_in_tile(1) < opaque_in_tile(3));
    }
}
