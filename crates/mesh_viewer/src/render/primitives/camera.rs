//! # Fixed-pose Perspective Camera
//!
//! The viewer camera never moves after framing, so its view matrix is computed
//! once. The projection depends only on the aspect ratio and is rebuilt when
//! the surface changes shape.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Aspect ratio changes smaller than this keep the cached projection
const ASPECT_EPSILON: f32 = 1e-4;

/// Perspective camera with cached view and projection matrices
///
/// # Coordinate System
/// View space is right-handed and Y-up. The projection matrix already
/// includes the Vulkan coordinate transform, so clip space is Y-down with
/// depth in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// Create a perspective camera looking from `position` at `target` with +Y up
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Width / height of the viewport
    /// * `near` / `far` - Clip plane distances, `0 < near < far`
    pub fn perspective(position: Vec3, target: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let up = Vec3::y();
        let fov = utils::deg_to_rad(fov_degrees);
        Self {
            position,
            target,
            up,
            fov,
            aspect,
            near,
            far,
            view: Self::compute_view(position, target, up),
            projection: Self::compute_projection(fov, aspect, near, far),
        }
    }

    /// View matrix: the inverse of the camera's look-at placement
    fn compute_view(position: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::camera_look_at(position, target, up)
            .try_inverse()
            .unwrap_or_else(|| {
                log::warn!("Degenerate camera placement at {:?}; using identity view", position);
                Mat4::identity()
            })
    }

    fn compute_projection(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective(fov, aspect, near, far) * Mat4::vulkan_coordinate_transform()
    }

    /// Update the aspect ratio, rebuilding the projection if it changed.
    ///
    /// Returns `true` when the projection was recomputed.
    pub fn set_aspect_ratio(&mut self, aspect: f32) -> bool {
        if !aspect.is_finite() || aspect <= 0.0 || (self.aspect - aspect).abs() < ASPECT_EPSILON {
            return false;
        }

        log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        self.aspect = aspect;
        self.projection = Self::compute_projection(self.fov, self.aspect, self.near, self.far);
        true
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Point the camera looks at
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Current aspect ratio
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Clip plane distances as `(near, far)`
    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// World to camera transform
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Camera to clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn framing_camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), 60.0, 1.5, 0.1, 30.0)
    }

    #[test]
    fn test_view_is_inverse_of_placement() {
        let camera = framing_camera();
        let placement = Mat4::camera_look_at(camera.position(), camera.target(), Vec3::y());

        assert_relative_eq!(camera.view_matrix() * placement, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = framing_camera();
        let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.xyz() / clip.w;

        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_up_maps_to_negative_clip_y() {
        let camera = framing_camera();
        let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn test_aspect_change_rebuilds_projection_only_when_needed() {
        let mut camera = framing_camera();
        let before = camera.projection_matrix();

        assert!(!camera.set_aspect_ratio(1.5));
        assert!(!camera.set_aspect_ratio(0.0));
        assert_eq!(camera.projection_matrix(), before);

        assert!(camera.set_aspect_ratio(2.0));
        assert_relative_eq!(camera.aspect(), 2.0);
        assert_ne!(camera.projection_matrix(), before);
    }
}
