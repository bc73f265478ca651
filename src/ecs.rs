//! ECS components for entity-based rendering.
//!
//! Built on `hecs`: entities with a [`Transform`](crate::Transform) and a
//! [`RenderMesh`] are drained into the frame's draw queue by
//! [`MeshQueue::queue_world`](crate::MeshQueue::queue_world), and entities with a
//! [`RenderProjector`] drive their projector's camera via
//! [`ProjectorSet::sync_world`](crate::ProjectorSet::sync_world) — move the entity,
//! and the projected image follows.

use crate::color::Color;

/// Type-safe handle to a mesh stored in the [`MeshQueue`](crate::MeshQueue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Type-safe handle to a texture stored in the [`MeshQueue`](crate::MeshQueue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Type-safe handle to a projector stored in a [`ProjectorSet`](crate::ProjectorSet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProjectorId(pub(crate) usize);

/// Component for rendering a mesh on an entity.
///
/// Attach alongside a [`Transform`](crate::Transform), then call
/// [`MeshQueue::queue_world`](crate::MeshQueue::queue_world) each frame.
#[derive(Clone, Copy, Debug)]
pub struct RenderMesh {
    /// Handle to the mesh geometry.
    pub mesh: MeshId,
    /// Color tint applied to the mesh.
    pub color: Color,
    /// Optional texture. If `None`, the mesh renders with its tint only.
    pub texture: Option<TextureId>,
}

impl RenderMesh {
    pub fn new(mesh: MeshId, color: Color) -> Self {
        Self {
            mesh,
            color,
            texture: None,
        }
    }

    pub fn with_texture(mesh: MeshId, color: Color, texture: TextureId) -> Self {
        Self {
            mesh,
            color,
            texture: Some(texture),
        }
    }
}

/// Component tying an entity's transform to a projector's camera.
///
/// [`ProjectorSet::sync_world`](crate::ProjectorSet::sync_world) copies the entity's
/// position and rotation onto the projector camera each time it is called.
#[derive(Clone, Copy, Debug)]
pub struct RenderProjector {
    /// Handle to the projector in the set.
    pub projector: ProjectorId,
}

impl RenderProjector {
    pub fn new(projector: ProjectorId) -> Self {
        Self { projector }
    }
}
