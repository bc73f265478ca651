//! 3D mesh primitives and spatial transforms for GPU rendering.
//!
//! - [`Vertex3d`] — vertex format shared by every pipeline in the crate
//! - [`Mesh`] — GPU-resident geometry with vertex and index buffers
//! - [`Transform`] — position, rotation, and scale for placing meshes
//!
//! The built-in primitives ([`Mesh::cube`], [`Mesh::sphere`], [`Mesh::plane`]) cover
//! the receiving surfaces most projection setups need; anything else can be built
//! from raw vertex/index data with [`Mesh::new`].

use crate::gpu::GpuContext;
use glam::{Mat4, Vec3};

/// A vertex with position, normal, and texture coordinates.
///
/// `#[repr(C)]` with a 32-byte layout: position at offset 0, normal at 12, uv at 24.
/// The layout is exposed as [`Vertex3d::LAYOUT`] for custom pipelines.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Position in model space.
    pub position: [f32; 3],
    /// Surface normal (normalized).
    pub normal: [f32; 3],
    /// Texture coordinates, typically in [0, 1].
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout descriptor for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// GPU-resident 3D mesh geometry with vertex and index buffers.
///
/// Once created the data lives on the GPU; meshes are immutable after upload.
/// All primitives use counter-clockwise winding for front faces.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Upload raw vertex and index data to the GPU.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex3d], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// A box centered at the origin.
    ///
    /// `half_extents` gives the half size along each axis, so
    /// `Mesh::cube(&gpu, Vec3::new(10.0, 0.1, 10.0))` is the flat 20x0.2x20 slab
    /// that makes a good projection floor. Each face has its own vertices for
    /// correct flat-shaded normals and maps the full [0,1] texture range.
    pub fn cube(gpu: &GpuContext, half_extents: Vec3) -> Self {
        let Vec3 { x, y, z } = half_extents;
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-x, -y,  z], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            Vertex3d::new([ x, -y,  z], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            Vertex3d::new([ x,  y,  z], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            Vertex3d::new([-x,  y,  z], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            // Back face (Z-)
            Vertex3d::new([ x, -y, -z], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            Vertex3d::new([-x, -y, -z], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            Vertex3d::new([-x,  y, -z], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            Vertex3d::new([ x,  y, -z], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            // Top face (Y+)
            Vertex3d::new([-x,  y,  z], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ x,  y,  z], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ x,  y, -z], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-x,  y, -z], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            // Bottom face (Y-)
            Vertex3d::new([-x, -y, -z], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ x, -y, -z], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ x, -y,  z], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-x, -y,  z], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            // Right face (X+)
            Vertex3d::new([ x, -y,  z], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ x, -y, -z], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ x,  y, -z], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ x,  y,  z], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            // Left face (X-)
            Vertex3d::new([-x, -y, -z], [-1.0,  0.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([-x, -y,  z], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-x,  y,  z], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-x,  y, -z], [-1.0,  0.0,  0.0], [0.0, 1.0]),
        ];

        #[rustfmt::skip]
        let indices: Vec<u32> = vec![
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        Self::new(gpu, &vertices, &indices)
    }

    /// A UV sphere with radius 0.5, centered at the origin.
    ///
    /// `segments` divides the equator, `rings` divides pole to pole. 32x16 is a
    /// reasonable middle ground.
    pub fn sphere(gpu: &GpuContext, segments: u32, rings: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let position = [x * 0.5, y * 0.5, z * 0.5];
                let normal = [x, y, z];
                let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];

                vertices.push(Vertex3d::new(position, normal, uv));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.push(current);
                indices.push(next);
                indices.push(current + 1);

                indices.push(current + 1);
                indices.push(next);
                indices.push(next + 1);
            }
        }

        Self::new(gpu, &vertices, &indices)
    }

    /// A flat square plane on the XZ axis with normals pointing up.
    pub fn plane(gpu: &GpuContext, size: f32) -> Self {
        let half = size * 0.5;
        let vertices = vec![
            Vertex3d::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex3d::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];

        let indices = vec![0, 1, 2, 2, 3, 0];

        Self::new(gpu, &vertices, &indices)
    }
}

/// Position, rotation, and scale for placing a mesh in the world.
///
/// Builder-style construction; [`Transform::matrix`] combines the components in
/// scale-rotate-translate order.
///
/// ```
/// use gobo::{Transform, Vec3, Quat};
///
/// let t = Transform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .rotation(Quat::from_rotation_y(0.5))
///     .uniform_scale(2.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: glam::Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: glam::Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: glam::Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// The model matrix, applying scale, then rotation, then translation.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn transform_applies_scale_before_translation() {
        let t = Transform::new()
            .position(Vec3::new(10.0, 0.0, 0.0))
            .uniform_scale(2.0);
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(12.0, 0.0, 0.0));
    }

    #[test]
    fn transform_rotation_spins_around_origin() {
        let t = Transform::new().rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
