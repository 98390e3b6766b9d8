use glam::{Mat3, Mat4, Quat, Vec3};

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, up: DEFAULT_UP, fov_y_radians, aspect, near, far }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Orients the camera towards `target`. The position is left untouched.
    pub fn look_at(&mut self, target: Vec3) {
        let mut z = self.position - target;
        if z.length_squared() <= f32::EPSILON {
            z = Vec3::Z;
        }
        z = z.normalize();
        let mut x = self.up.cross(z);
        if x.length_squared() <= f32::EPSILON {
            // Looking straight along `up`; nudge so the basis stays defined.
            if self.up.z.abs() >= 1.0 - f32::EPSILON {
                z.x += 1e-4;
            } else {
                z.z += 1e-4;
            }
            z = z.normalize();
            x = self.up.cross(z);
        }
        let x = x.normalize();
        let y = z.cross(x);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize();
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = if height > 0 { width as f32 / height as f32 } else { 1.0 };
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, self.aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
