//! Perspective camera and the orbital controller that drives it
//!
//! The camera keeps the classic position/target/up description. Each frame the
//! orbital controller rotates the position around the target's up axis at a
//! fixed angular speed and moves it along the view ray by the mouse wheel.

use cgmath::{
    perspective, Deg, InnerSpace, Matrix4, Point3, Quaternion, Rotation, Rotation3, Vector3,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Flips clip-space Y; used when rendering into a bottom-left origin target
#[rustfmt::skip]
pub const FLIP_Y_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0,  0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0,  0.0, 1.0, 0.0,
    0.0,  0.0, 0.0, 1.0,
);

/// Radians per second of automatic orbit
pub const ORBITAL_SPEED: f32 = 0.5;
pub const ZOOM_SPEED: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraProjection {
    Perspective,
}

#[derive(Debug, Clone, Copy)]
pub struct Camera3D {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fovy: f32,
    pub projection: CameraProjection,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera3D {
    pub fn perspective(position: Vector3<f32>, target: Vector3<f32>, fovy: f32) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
            fovy,
            projection: CameraProjection::Perspective,
            znear: 0.01,
            zfar: 1000.0,
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    pub fn build_view_projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        let target = Point3::new(self.target.x, self.target.y, self.target.z);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        let proj = match self.projection {
            CameraProjection::Perspective => {
                perspective(Deg(self.fovy), aspect, self.znear, self.zfar)
            }
        };
        OPENGL_TO_WGPU_MATRIX * proj * view
    }

    /// Rotates around the target and applies wheel zoom
    ///
    /// `wheel` is in lines; positive values move the camera towards the target.
    pub fn update_orbital(&mut self, dt: f32, wheel: f32) {
        let bounds = OrbitalBounds::default();
        let rotation = Quaternion::from_axis_angle(self.up.normalize(), cgmath::Rad(-ORBITAL_SPEED * dt));
        let offset = rotation.rotate_vector(self.position - self.target);

        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return;
        }

        let zoomed = (distance - wheel * ZOOM_SPEED).clamp(bounds.min_distance, bounds.max_distance);
        self.position = self.target + offset * (zoomed / distance);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitalBounds {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitalBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 64.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(view_proj: Matrix4<f32>) -> Self {
        Self {
            view_proj: convert_matrix4_to_array(view_proj),
        }
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            result[i][j] = matrix4[i][j];
        }
    }

    result
}
