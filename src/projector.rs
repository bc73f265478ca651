//! Texture projectors and their per-frame parameters.
//!
//! A [`Projector`] is a configuration record: a camera defining where the texture
//! lands, a handle to the projective map, and optional falloff, combine, and
//! geometry-target settings. Projectors live in a [`ProjectorSet`]; the set's list
//! order is the draw order, so later projectors composite over earlier ones.
//!
//! [`TileAnimation`] holds the tile-atlas animation parameters shared by a
//! [`ProjectorPass`](crate::ProjectorPass): the projective map is treated as a grid
//! of `tiles_u` x `tiles_v` frames and the displayed frame advances with time.

use glam::{Mat4, Vec3, Vec4};
use hecs::World;

use crate::camera::Camera;
use crate::ecs::{MeshId, ProjectorId, RenderProjector, TextureId};
use crate::mesh::Transform;

/// Distance-based attenuation for a projector.
///
/// Fragments at `distance` or beyond receive nothing; closer fragments fade in
/// with the given exponent. For perspective projectors the distance is measured
/// from the projector location, for parallel projectors along the projection
/// direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Falloff {
    /// World-space distance at which the projection fades out entirely.
    pub distance: f32,
    /// Exponent shaping the fade curve. 1.0 is linear; higher keeps the image
    /// bright longer and drops it faster near the edge.
    pub power: f32,
}

impl Falloff {
    pub fn new(distance: f32, power: f32) -> Self {
        Self { distance, power }
    }
}

/// How a projected layer composites over what is already on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CombineMode {
    /// Standard alpha blending.
    #[default]
    Blend,
    /// Alpha-blend the color but accumulate alpha, so overlapping projections
    /// keep reinforcing each other.
    BlendAddAlpha,
    /// Additive: projected color brightens the scene.
    Add,
    /// Modulate: projected color multiplies the scene, darkening it. Good for
    /// shadow gobos.
    Multiply,
}

impl CombineMode {
    /// Blend state for the single-projector pipeline using this mode.
    pub(crate) fn blend_state(self) -> wgpu::BlendState {
        match self {
            CombineMode::Blend => wgpu::BlendState::ALPHA_BLENDING,
            CombineMode::BlendAddAlpha => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            CombineMode::Add => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            // The shader pre-mixes toward white by (1 - alpha), so src * dst
            // gives an alpha-weighted modulate.
            CombineMode::Multiply => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::Zero,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }

    /// Index used to select the mode inside shaders.
    pub(crate) fn shader_index(self) -> u32 {
        match self {
            CombineMode::Blend => 0,
            CombineMode::BlendAddAlpha => 1,
            CombineMode::Add => 2,
            CombineMode::Multiply => 3,
        }
    }

    pub(crate) const ALL: [CombineMode; 4] = [
        CombineMode::Blend,
        CombineMode::BlendAddAlpha,
        CombineMode::Add,
        CombineMode::Multiply,
    ];
}

/// Tile-atlas animation parameters.
///
/// The projective map is addressed as a `tiles_u` x `tiles_v` grid. At time `t`
/// the displayed cell is `floor(t * speed) mod tiles` independently per axis, so
/// a 6x1 strip at speed 20 steps through its six frames twenty times a second
/// (revisiting each frame as the counter wraps).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileAnimation {
    pub tiles_u: u32,
    pub tiles_v: u32,
    /// Tile advance rate in tiles per second.
    pub speed: f32,
}

impl TileAnimation {
    /// A single static tile: the whole texture, no animation.
    pub const STATIC: TileAnimation = TileAnimation {
        tiles_u: 1,
        tiles_v: 1,
        speed: 0.0,
    };

    /// Tile counts are clamped to at least 1.
    pub fn new(tiles_u: u32, tiles_v: u32, speed: f32) -> Self {
        Self {
            tiles_u: tiles_u.max(1),
            tiles_v: tiles_v.max(1),
            speed,
        }
    }

    /// The tile selected at `time` seconds, per axis.
    pub fn select(&self, time: f32) -> (u32, u32) {
        let frame = (time * self.speed).max(0.0).floor() as u64;
        (
            (frame % self.tiles_u.max(1) as u64) as u32,
            (frame % self.tiles_v.max(1) as u64) as u32,
        )
    }
}

impl Default for TileAnimation {
    fn default() -> Self {
        Self::STATIC
    }
}

/// A texture projector: a virtual camera that throws a texture onto the scene.
#[derive(Clone, Debug)]
pub struct Projector {
    /// The projector's transform and frustum. A perspective projection spreads
    /// the texture with distance; a parallel projection keeps it constant-size.
    pub camera: Camera,
    /// The projective map.
    pub texture: TextureId,
    /// Optional distance attenuation. `None` projects at full strength to the
    /// far plane.
    pub falloff: Option<Falloff>,
    /// How the projected layer composites over the scene.
    pub combine: CombineMode,
    /// Restrict the projection to these meshes. `None` projects onto everything
    /// queued this frame.
    pub target: Option<Vec<MeshId>>,
}

impl Projector {
    pub fn new(camera: Camera, texture: TextureId) -> Self {
        Self {
            camera,
            texture,
            falloff: None,
            combine: CombineMode::default(),
            target: None,
        }
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = Some(falloff);
        self
    }

    pub fn with_combine(mut self, combine: CombineMode) -> Self {
        self.combine = combine;
        self
    }

    pub fn with_target(mut self, meshes: Vec<MeshId>) -> Self {
        self.target = Some(meshes);
        self
    }

    /// True if this projector uses a parallel projection.
    pub fn is_parallel(&self) -> bool {
        self.camera.projection.is_parallel()
    }

    /// World-space position of the projector. Meaningful for perspective
    /// projectors, where attenuation is radial from this point.
    pub fn location(&self) -> Vec3 {
        self.camera.position
    }

    /// World-space projection direction. Meaningful for parallel projectors,
    /// where attenuation grows along this axis.
    pub fn direction(&self) -> Vec3 {
        self.camera.forward.normalize_or_zero()
    }

    /// Matrix taking world-space points into the projector's texture space:
    /// inside the frustum, `(matrix * p).xy / w` lands in [0, 1]².
    pub fn texture_matrix(&self) -> Mat4 {
        texture_bias() * self.camera.view_projection()
    }
}

// Clip space to texture space: x,y from [-1,1] to [0,1] with v pointing down.
fn texture_bias() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    )
}

/// The mutable, ordered collection of projectors rendered by the projector
/// passes. List order determines draw order.
#[derive(Default)]
pub struct ProjectorSet {
    projectors: Vec<Projector>,
}

impl ProjectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a projector and return its handle.
    pub fn add(&mut self, projector: Projector) -> ProjectorId {
        let idx = self.projectors.len();
        self.projectors.push(projector);
        ProjectorId(idx)
    }

    pub fn get(&self, id: ProjectorId) -> Option<&Projector> {
        self.projectors.get(id.0)
    }

    pub fn get_mut(&mut self, id: ProjectorId) -> Option<&mut Projector> {
        self.projectors.get_mut(id.0)
    }

    /// All projectors in draw order.
    pub fn projectors(&self) -> &[Projector] {
        &self.projectors
    }

    pub fn len(&self) -> usize {
        self.projectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectors.is_empty()
    }

    /// Copy entity transforms onto projector cameras.
    ///
    /// Every entity carrying a [`Transform`] and a [`RenderProjector`] component
    /// drives the camera of the projector it points at: position from the entity
    /// position, forward/up from the entity rotation.
    pub fn sync_world(&mut self, world: &World) {
        let mut query = world.query::<(&Transform, &RenderProjector)>();
        for (_entity, (transform, marker)) in query.iter() {
            match self.projectors.get_mut(marker.projector.0) {
                Some(projector) => {
                    projector.camera.position = transform.position;
                    projector.camera.forward = transform.rotation * Vec3::NEG_Z;
                    projector.camera.up = transform.rotation * Vec3::Y;
                }
                None => log::warn!("RenderProjector points at unknown projector"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec2};

    fn project_uv(projector: &Projector, world: Vec3) -> Vec2 {
        let clip = projector.texture_matrix() * world.extend(1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }

    fn downward_parallel() -> Projector {
        Projector::new(
            Camera::new()
                .at(Vec3::new(0.0, 4.0, 0.0))
                .looking_in(Vec3::NEG_Y)
                .with_up(Vec3::X)
                .parallel(1.5, 1.5, 1.0, 5.0),
            TextureId(0),
        )
    }

    #[test]
    fn static_animation_always_selects_first_tile() {
        assert_eq!(TileAnimation::STATIC.select(123.4), (0, 0));
    }

    #[test]
    fn tile_selection_wraps_per_axis() {
        let anim = TileAnimation::new(6, 4, 20.0);
        assert_eq!(anim.select(0.0), (0, 0));
        // 0.36s * 20 = frame 7: 7 mod 6 = 1, 7 mod 4 = 3
        assert_eq!(anim.select(0.36), (1, 3));
        // 0.31s * 20 = frame 6: wraps the u axis
        assert_eq!(anim.select(0.31), (0, 2));
    }

    #[test]
    fn negative_time_clamps_to_first_frame() {
        let anim = TileAnimation::new(6, 1, 20.0);
        assert_eq!(anim.select(-5.0), (0, 0));
    }

    #[test]
    fn zero_tile_counts_are_clamped() {
        let anim = TileAnimation::new(0, 0, 10.0);
        assert_eq!((anim.tiles_u, anim.tiles_v), (1, 1));
        assert_eq!(anim.select(10.0), (0, 0));
    }

    #[test]
    fn texture_matrix_centers_the_frustum_axis() {
        let uv = project_uv(&downward_parallel(), Vec3::new(0.0, 2.0, 0.0));
        assert!((uv - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn texture_matrix_maps_frustum_edges_to_uv_borders() {
        let p = downward_parallel();
        // Camera looks -Y with up +X: right axis is +Z, so +Z maps to u = 1.
        let right_edge = project_uv(&p, Vec3::new(0.0, 2.0, 1.5));
        assert!((right_edge - Vec2::new(1.0, 0.5)).length() < 1e-4);
        // +X is the camera's up: v runs downward, so up maps to v = 0.
        let top_edge = project_uv(&p, Vec3::new(1.5, 2.0, 0.0));
        assert!((top_edge - Vec2::new(0.5, 0.0)).length() < 1e-4);
    }

    #[test]
    fn parallel_projectors_report_direction() {
        let p = downward_parallel();
        assert!(p.is_parallel());
        assert!((p.direction() - Vec3::NEG_Y).length() < 1e-6);
        assert_eq!(p.location(), Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn combine_modes_have_unique_shader_indices() {
        let mut seen: Vec<u32> = CombineMode::ALL.iter().map(|m| m.shader_index()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), CombineMode::ALL.len());
    }

    #[test]
    fn blend_mode_matches_standard_alpha_blending() {
        assert_eq!(
            CombineMode::Blend.blend_state(),
            wgpu::BlendState::ALPHA_BLENDING
        );
    }

    #[test]
    fn set_preserves_insertion_order() {
        let mut set = ProjectorSet::new();
        let a = set.add(downward_parallel());
        let b = set.add(downward_parallel().with_combine(CombineMode::Add));
        assert_eq!((a, b), (ProjectorId(0), ProjectorId(1)));
        assert_eq!(set.projectors()[1].combine, CombineMode::Add);
    }

    #[test]
    fn sync_world_drives_projector_cameras() {
        let mut set = ProjectorSet::new();
        let id = set.add(downward_parallel());

        let mut world = World::new();
        world.spawn((
            Transform::from_position(Vec3::new(3.0, 1.0, -2.0))
                .rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
            RenderProjector::new(id),
        ));

        set.sync_world(&world);
        let cam = set.get(id).unwrap().camera;
        assert_eq!(cam.position, Vec3::new(3.0, 1.0, -2.0));
        // Yawed 90 degrees: forward swings from -Z to -X.
        assert!((cam.forward - Vec3::NEG_X).length() < 1e-5);
    }
}
