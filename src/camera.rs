//! Cameras for viewing and projecting.
//!
//! The same [`Camera`] type serves two roles: the viewer camera that renders the
//! scene, and the virtual camera inside each [`Projector`](crate::Projector) that
//! defines where its texture lands. A camera is a position, an orientation, and a
//! [`Projection`] — either perspective (textures spread with distance, like a slide
//! projector) or parallel (textures keep their size, like a directional decal).

use glam::{Mat4, Vec3};

/// The projection half of a camera: perspective or parallel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Standard perspective frustum.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width / height of the frustum.
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Orthographic box frustum. Projected textures do not change size with
    /// distance from the camera.
    Parallel {
        /// Half extent of the box along the camera's right axis.
        half_width: f32,
        /// Half extent of the box along the camera's up axis.
        half_height: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Projection matrix with wgpu depth conventions (z in [0, 1]).
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Parallel {
                half_width,
                half_height,
                near,
                far,
            } => Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                near,
                far,
            ),
        }
    }

    /// True for [`Projection::Parallel`].
    pub fn is_parallel(&self) -> bool {
        matches!(self, Projection::Parallel { .. })
    }
}

/// A camera with position, orientation, and projection.
///
/// Built with a fluent API:
///
/// ```
/// use gobo::{Camera, Vec3};
///
/// let cam = Camera::new()
///     .at(Vec3::new(1.0, 2.1, 2.0))
///     .looking_at(Vec3::ZERO)
///     .perspective(45.0, 1.0, 1.0, 5.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    /// View direction. Normalized by the `looking_*` builders.
    pub forward: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            projection: Projection::Perspective {
                fov_y: std::f32::consts::FRAC_PI_2,
                aspect: 1.0,
                near: 0.1,
                far: 1000.0,
            },
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Orient the camera toward a world-space target.
    pub fn looking_at(mut self, target: Vec3) -> Self {
        let dir = target - self.position;
        if dir.length_squared() > 0.0 {
            self.forward = dir.normalize();
        }
        self
    }

    /// Orient the camera along a direction.
    pub fn looking_in(mut self, direction: Vec3) -> Self {
        if direction.length_squared() > 0.0 {
            self.forward = direction.normalize();
        }
        self
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    /// Set a perspective projection. `fov_y` is in degrees.
    pub fn perspective(mut self, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        self.projection = Projection::Perspective {
            fov_y: fov_y.to_radians(),
            aspect,
            near,
            far,
        };
        self
    }

    /// Set a parallel (orthographic) projection.
    pub fn parallel(mut self, half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        self.projection = Projection::Parallel {
            half_width,
            half_height,
            near,
            far,
        };
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize()
    }

    /// World to camera space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Camera to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// World to clip space.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The eight world-space corners of the camera frustum.
    ///
    /// Ordered near plane first, each plane counter-clockwise starting at the
    /// bottom-left corner (as seen from the camera). Useful for drawing wire
    /// frustums around projectors.
    pub fn frustum_corners(&self) -> [Vec3; 8] {
        let inv = self.view_projection().inverse();
        let mut corners = [Vec3::ZERO; 8];
        // wgpu clip space: x,y in [-1,1], z in [0,1]
        let ndc = [
            (-1.0, -1.0),
            (1.0, -1.0),
            (1.0, 1.0),
            (-1.0, 1.0),
        ];
        for (i, &(x, y)) in ndc.iter().enumerate() {
            corners[i] = inv.project_point3(Vec3::new(x, y, 0.0));
            corners[i + 4] = inv.project_point3(Vec3::new(x, y, 1.0));
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn view_matrix_moves_eye_to_origin() {
        let cam = Camera::new().at(Vec3::new(3.0, -2.0, 7.0));
        let eye = cam.view_matrix().transform_point3(cam.position);
        assert!(approx(eye, Vec3::ZERO));
    }

    #[test]
    fn looking_at_normalizes_forward() {
        let cam = Camera::new()
            .at(Vec3::new(0.0, 0.0, 10.0))
            .looking_at(Vec3::ZERO);
        assert!(approx(cam.forward, Vec3::NEG_Z));
    }

    #[test]
    fn parallel_frustum_corners_span_the_box() {
        let cam = Camera::new()
            .at(Vec3::ZERO)
            .looking_in(Vec3::NEG_Z)
            .parallel(2.0, 1.0, 1.0, 5.0);
        let corners = cam.frustum_corners();
        // Near plane sits 1 unit in front of the eye, 4x2 units wide.
        assert!(approx(corners[0], Vec3::new(-2.0, -1.0, -1.0)));
        assert!(approx(corners[2], Vec3::new(2.0, 1.0, -1.0)));
        // Far plane has the same extent for a parallel projection.
        assert!(approx(corners[4], Vec3::new(-2.0, -1.0, -5.0)));
        assert!(approx(corners[6], Vec3::new(2.0, 1.0, -5.0)));
    }

    #[test]
    fn perspective_center_projects_to_ndc_origin() {
        let cam = Camera::new()
            .at(Vec3::new(0.0, 5.0, 0.0))
            .looking_in(Vec3::NEG_Y)
            .with_up(Vec3::X)
            .perspective(90.0, 1.0, 0.5, 10.0);
        let ndc = cam
            .view_projection()
            .project_point3(Vec3::new(0.0, 2.0, 0.0));
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn projection_kind_is_reported() {
        let cam = Camera::new().parallel(1.0, 1.0, 0.1, 10.0);
        assert!(cam.projection.is_parallel());
        assert!(!Camera::new().projection.is_parallel());
    }
}
