//! Per-frame render loop
//!
//! Every frame: match the surface to the display, set the viewport, enable
//! depth testing, upload the shared uniforms, then draw each part with the
//! shared world matrix `rotation_y(time) * translation(offset)`.

use crate::config::{CameraConfig, LightingConfig};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::api::{BackendResult, FrameStatus, RenderBackend, SharedUniforms};
use crate::render::primitives::Camera;
use crate::scene::{CameraPlan, Part};

/// Drives one frame at a time against a [`RenderBackend`]
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    camera: Camera,
    offset: Vec3,
    light_direction: Vec3,
    frames_rendered: u64,
}

impl FrameRenderer {
    /// Create a renderer for a framed scene
    ///
    /// The aspect ratio is taken from the backend's surface on every frame;
    /// `initial_aspect` only seeds the projection.
    pub fn new(plan: &CameraPlan, camera: &CameraConfig, lighting: &LightingConfig, initial_aspect: f32) -> Self {
        let light = Vec3::from(lighting.direction);
        Self {
            camera: Camera::perspective(
                plan.position,
                plan.target,
                camera.fov_degrees,
                initial_aspect,
                plan.near,
                plan.far,
            ),
            offset: plan.offset,
            light_direction: light.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y),
            frames_rendered: 0,
        }
    }

    /// The camera in use
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Frames that reached `end_frame`
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// World matrix at `time_seconds`: spin about the recentered origin
    ///
    /// The angle is reduced modulo 2π first; the rotation is periodic so the
    /// result is unchanged while precision holds for long runs.
    pub fn world_matrix(&self, time_seconds: f64) -> Mat4 {
        Mat4::rotation_y(utils::wrap_angle(time_seconds)) * Mat4::translation(self.offset)
    }

    /// Uniforms shared by every part this frame
    pub fn shared_uniforms(&self) -> SharedUniforms {
        SharedUniforms {
            light_direction: self.light_direction,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            view_world_position: self.camera.position(),
        }
    }

    /// Render one frame of `parts` at `time_seconds` since the loop started
    pub fn render_frame<B>(&mut self, backend: &mut B, parts: &[Part], time_seconds: f64) -> BackendResult<FrameStatus>
    where
        B: RenderBackend + ?Sized,
    {
        let (display_width, display_height) = backend.display_size();
        if display_width == 0 || display_height == 0 {
            return Ok(FrameStatus::Skipped);
        }
        if backend.surface_size() != (display_width, display_height) {
            log::debug!("Resizing surface to {}x{}", display_width, display_height);
            backend.resize_surface(display_width, display_height)?;
        }

        if backend.begin_frame()? == FrameStatus::Skipped {
            return Ok(FrameStatus::Skipped);
        }

        let (width, height) = backend.surface_size();
        backend.set_viewport(0, 0, width, height);
        backend.set_depth_test(true);

        self.camera.set_aspect_ratio(width as f32 / height.max(1) as f32);
        backend.set_shared_uniforms(&self.shared_uniforms())?;

        let world = self.world_matrix(time_seconds);
        for part in parts {
            backend.bind_vertex_buffer(part.buffer)?;
            backend.set_part_uniforms(&world, &part.uniforms)?;
            backend.draw(part.buffer)?;
        }

        backend.end_frame()?;
        self.frames_rendered += 1;
        log::trace!("Frame {} drew {} parts", self.frames_rendered, parts.len());
        Ok(FrameStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Geometry, GeometryData};
    use crate::config::{MaterialOverrides, MaterialTemplateConfig};
    use crate::render::headless::{RecordedCall, RecordingBackend};
    use crate::scene::{assemble, default_template, Extents, MaterialResolver, TextureTable};
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn scene(backend: &mut RecordingBackend) -> (Vec<Part>, CameraPlan) {
        let geometries: Vec<Geometry> = ["a", "b"]
            .iter()
            .map(|name| Geometry {
                object: None,
                groups: Vec::new(),
                material: name.to_string(),
                data: GeometryData {
                    position: vec![1.0, 1.0, 1.0, 3.0, 1.0, 1.0, 1.0, 3.0, 1.0],
                    ..GeometryData::default()
                },
            })
            .collect();

        let label = backend.create_solid_texture([0, 0, 0, 255]).unwrap();
        let white = backend.create_solid_texture([255; 4]).unwrap();
        let resolver = MaterialResolver::new(
            TextureTable::new(label, white),
            default_template(&MaterialTemplateConfig::default(), white),
            MaterialOverrides::default(),
        );

        let parts = assemble(backend, &geometries, &resolver).unwrap();
        let plan = CameraPlan::from_extents(&Extents::from_geometries(&geometries).unwrap());
        (parts, plan)
    }

    fn renderer(plan: &CameraPlan) -> FrameRenderer {
        FrameRenderer::new(plan, &CameraConfig::default(), &LightingConfig::default(), 1.0)
    }

    #[test]
    fn test_frame_call_sequence() {
        let mut backend = RecordingBackend::new(800, 600);
        let (parts, plan) = scene(&mut backend);
        let mut frame = renderer(&plan);
        backend.take_calls();

        let status = frame.render_frame(&mut backend, &parts, 0.5).unwrap();
        assert_eq!(status, FrameStatus::Ready);

        let calls = backend.take_calls();
        assert_eq!(calls[0], RecordedCall::BeginFrame);
        assert_eq!(calls[1], RecordedCall::SetViewport { x: 0, y: 0, width: 800, height: 600 });
        assert_eq!(calls[2], RecordedCall::SetDepthTest(true));
        assert!(matches!(calls[3], RecordedCall::SetSharedUniforms(_)));

        let draws: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Draw { buffer, vertex_count } => Some((*buffer, *vertex_count)),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![(parts[0].buffer, 3), (parts[1].buffer, 3)]);
        assert_eq!(calls.last(), Some(&RecordedCall::EndFrame));
        assert_eq!(frame.frames_rendered(), 1);
    }

    #[test]
    fn test_shared_uniforms() {
        let mut backend = RecordingBackend::new(800, 600);
        let (_, plan) = scene(&mut backend);
        let uniforms = renderer(&plan).shared_uniforms();

        let expected = Vec3::new(-1.0, 3.0, 5.0).normalize();
        assert_relative_eq!(uniforms.light_direction, expected, epsilon = 1e-6);
        assert_relative_eq!(uniforms.view_world_position, plan.position);
        assert_relative_eq!(
            uniforms.view * Mat4::camera_look_at(plan.position, plan.target, Vec3::y()),
            Mat4::identity(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_projection_uses_plan_clip_planes_and_fov() {
        let mut backend = RecordingBackend::new(800, 600);
        let (_, plan) = scene(&mut backend);
        let projection = renderer(&plan).shared_uniforms().projection;

        let project = |point: Vec4| {
            let clip = projection * point;
            clip.xyz() / clip.w
        };

        assert_relative_eq!(project(Vec4::new(0.0, 0.0, -plan.near, 1.0)).z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(project(Vec4::new(0.0, 0.0, -plan.far, 1.0)).z, 1.0, epsilon = 1e-4);

        // 60 degree vertical field of view: the top edge sits at tan(30°) * depth,
        // which lands on y = -1 with Vulkan's downward y axis
        let depth = plan.radius;
        let top = (30.0_f32).to_radians().tan() * depth;
        assert_relative_eq!(project(Vec4::new(0.0, top, -depth, 1.0)).y, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_world_matrix_recenters_then_rotates() {
        let mut backend = RecordingBackend::new(800, 600);
        let (_, plan) = scene(&mut backend);
        let frame = renderer(&plan);

        // Box center (2, 2, 1) lands on the origin at any time
        let center = nalgebra::Point3::new(2.0, 2.0, 1.0);
        for time in [0.0, 1.0, 1234.5] {
            let moved = frame.world_matrix(time).transform_point(&center);
            assert_relative_eq!(moved.coords, Vec3::zeros(), epsilon = 1e-5);
        }

        // A point off-center rotates about the origin, not around the old center
        let corner = nalgebra::Point3::new(3.0, 2.0, 1.0);
        let quarter = frame.world_matrix(std::f64::consts::FRAC_PI_2).transform_point(&corner);
        assert_relative_eq!(quarter.coords, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_world_matrix_is_periodic() {
        let mut backend = RecordingBackend::new(800, 600);
        let (_, plan) = scene(&mut backend);
        let frame = renderer(&plan);

        assert_relative_eq!(
            frame.world_matrix(0.75),
            frame.world_matrix(0.75 + std::f64::consts::TAU * 10.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_resize_follows_display() {
        let mut backend = RecordingBackend::new(800, 600);
        let (parts, plan) = scene(&mut backend);
        let mut frame = renderer(&plan);

        backend.set_display_size(1024, 512);
        frame.render_frame(&mut backend, &parts, 0.0).unwrap();

        assert_eq!(backend.surface_size(), (1024, 512));
        assert!(backend.calls().contains(&RecordedCall::ResizeSurface { width: 1024, height: 512 }));
        assert_relative_eq!(frame.camera().aspect(), 2.0);
    }

    #[test]
    fn test_minimized_display_skips_frame() {
        let mut backend = RecordingBackend::new(800, 600);
        let (parts, plan) = scene(&mut backend);
        let mut frame = renderer(&plan);
        backend.take_calls();

        backend.set_display_size(0, 0);
        let status = frame.render_frame(&mut backend, &parts, 0.0).unwrap();

        assert_eq!(status, FrameStatus::Skipped);
        assert!(backend.calls().is_empty());
        assert_eq!(frame.frames_rendered(), 0);
    }
}
