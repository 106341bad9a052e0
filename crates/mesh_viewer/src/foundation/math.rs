//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the matrix helpers the viewer needs for
//! camera framing and the per-frame world transform.

pub use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = std::f32::consts::TAU;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Reduce an unbounded angle in radians into `[0, 2π)`.
    ///
    /// The reduction happens in `f64` so that long run times keep their
    /// sub-frame precision before narrowing to `f32`.
    pub fn wrap_angle(radians: f64) -> f32 {
        radians.rem_euclid(std::f64::consts::TAU) as f32
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a translation matrix
    fn translation(offset: Vec3) -> Mat4;

    /// Create a perspective projection matrix with Vulkan depth range `[0, 1]`
    ///
    /// The result expects view-space geometry in front of the camera along +Z,
    /// so it is paired with [`Mat4Ext::vulkan_coordinate_transform`].
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix (world to camera)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create a look-at camera matrix (camera to world)
    ///
    /// This is the placement of the camera in the world; its inverse is the
    /// view matrix returned by [`Mat4Ext::look_at`].
    fn camera_look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Flip Y and Z so a right-handed, Y-up view space lines up with Vulkan
    /// clip space (Y down, Z into the screen)
    fn vulkan_coordinate_transform() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn translation(offset: Vec3) -> Mat4 {
        Mat4::new_translation(&offset)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [1/(a*tan(φ/2))  0            0          0         ]
        //     [0               1/tan(φ/2)   0          0         ]
        //     [0               0            f/(f-n)    -nf/(f-n) ]
        //     [0               0            1          0         ]
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * Mat4::translation(-eye)
    }

    fn camera_look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        // Columns are the camera basis expressed in world space
        let z_axis = (eye - target).normalize();
        let x_axis = up.cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis).normalize();

        Mat4::new(
            x_axis.x, y_axis.x, z_axis.x, eye.x,
            x_axis.y, y_axis.y, z_axis.y, eye.y,
            x_axis.z, y_axis.z, z_axis.z, eye.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn vulkan_coordinate_transform() -> Mat4 {
        Mat4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_look_at_inverse_matches_view() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let target = Vec3::zeros();
        let up = Vec3::y();

        let camera = Mat4::camera_look_at(eye, target, up);
        let view = camera.try_inverse().unwrap();

        assert_relative_eq!(view, Mat4::look_at(eye, target, up), epsilon = 1e-5);
    }

    #[test]
    fn test_view_moves_target_in_front_of_camera() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());
        let origin = view.transform_point(&nalgebra::Point3::origin());

        // Right-handed view space looks down -Z
        assert_relative_eq!(origin.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_depth_range() {
        let (near, far) = (0.5, 20.0);
        let projection = Mat4::perspective(utils::deg_to_rad(60.0), 1.0, near, far)
            * Mat4::vulkan_coordinate_transform();

        let project_depth = |z: f32| {
            let clip = projection * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };

        assert_relative_eq!(project_depth(-near), 0.0, epsilon = 1e-5);
        assert_relative_eq!(project_depth(-far), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_y_quarter_turn() {
        let rotated = Mat4::rotation_y(constants::PI * 0.5).transform_vector(&Vec3::x());
        assert_relative_eq!(rotated, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(utils::wrap_angle(0.25), 0.25, epsilon = 1e-6);
        assert_relative_eq!(
            utils::wrap_angle(std::f64::consts::TAU * 1000.0 + 1.0),
            1.0,
            epsilon = 1e-4
        );
        assert!(utils::wrap_angle(-0.5) > 0.0);
    }
}
