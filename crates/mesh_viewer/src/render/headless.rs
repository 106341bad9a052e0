//! Headless recording backend
//!
//! Implements [`RenderBackend`] without a GPU. Resources are kept in memory
//! and every frame call is appended to a log, which makes scene bootstrap and
//! the render loop observable in tests and in `--headless` runs.

use crate::assets::ImageData;
use crate::foundation::math::Mat4;
use crate::render::api::{
    BackendResult, BufferHandle, FrameStatus, MaterialUniforms, RenderBackend, SharedUniforms, TextureHandle,
    VertexAttributes,
};
use crate::render::RenderError;
use slotmap::SlotMap;

/// A call observed by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// Surface resized
    ResizeSurface {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// Frame started
    BeginFrame,
    /// Viewport set
    SetViewport {
        /// Left edge
        x: u32,
        /// Top edge
        y: u32,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// Depth test toggled
    SetDepthTest(bool),
    /// Shared uniforms uploaded
    SetSharedUniforms(SharedUniforms),
    /// Vertex buffer bound
    BindVertexBuffer(BufferHandle),
    /// Per-part uniforms set
    SetPartUniforms {
        /// World matrix
        world: Mat4,
        /// Material values
        material: MaterialUniforms,
    },
    /// Draw issued
    Draw {
        /// Buffer drawn
        buffer: BufferHandle,
        /// Vertices drawn
        vertex_count: usize,
    },
    /// Frame finished
    EndFrame,
}

/// In-memory [`RenderBackend`] that records every call
#[derive(Debug)]
pub struct RecordingBackend {
    textures: SlotMap<TextureHandle, ImageData>,
    buffers: SlotMap<BufferHandle, VertexAttributes>,
    display_size: (u32, u32),
    surface_size: (u32, u32),
    bound_buffer: Option<BufferHandle>,
    in_frame: bool,
    calls: Vec<RecordedCall>,
}

impl RecordingBackend {
    /// Create a backend whose display and surface are `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            textures: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            display_size: (width, height),
            surface_size: (width, height),
            bound_buffer: None,
            in_frame: false,
            calls: Vec::new(),
        }
    }

    /// Simulate the display (window) changing size
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.display_size = (width, height);
    }

    /// Calls recorded so far
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Take and clear the call log
    pub fn take_calls(&mut self) -> Vec<RecordedCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of textures created
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Image stored for a texture
    pub fn texture(&self, handle: TextureHandle) -> Option<&ImageData> {
        self.textures.get(handle)
    }

    /// Number of vertex buffers created
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Attributes stored for a buffer
    pub fn buffer(&self, handle: BufferHandle) -> Option<&VertexAttributes> {
        self.buffers.get(handle)
    }

    fn require_frame(&self, operation: &str) -> BackendResult<()> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RenderError::RenderingFailed(format!("{} called outside of a frame", operation)))
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.data.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture {}x{} with {} bytes",
                image.width,
                image.height,
                image.data.len()
            )));
        }
        Ok(self.textures.insert(image.clone()))
    }

    fn create_vertex_buffer(&mut self, attributes: &VertexAttributes) -> BackendResult<BufferHandle> {
        if attributes.vertex_count() == 0 {
            return Err(RenderError::ResourceCreationFailed("empty vertex buffer".to_string()));
        }
        Ok(self.buffers.insert(attributes.clone()))
    }

    fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.surface_size = (width, height);
        self.calls.push(RecordedCall::ResizeSurface { width, height });
        Ok(())
    }

    fn begin_frame(&mut self) -> BackendResult<FrameStatus> {
        if self.in_frame {
            return Err(RenderError::RenderingFailed("begin_frame called twice".to_string()));
        }
        self.in_frame = true;
        self.bound_buffer = None;
        self.calls.push(RecordedCall::BeginFrame);
        Ok(FrameStatus::Ready)
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.calls.push(RecordedCall::SetViewport { x, y, width, height });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(RecordedCall::SetDepthTest(enabled));
    }

    fn set_shared_uniforms(&mut self, uniforms: &SharedUniforms) -> BackendResult<()> {
        self.require_frame("set_shared_uniforms")?;
        self.calls.push(RecordedCall::SetSharedUniforms(*uniforms));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle) -> BackendResult<()> {
        self.require_frame("bind_vertex_buffer")?;
        if !self.buffers.contains_key(buffer) {
            return Err(RenderError::InvalidHandle(format!("{:?}", buffer)));
        }
        self.bound_buffer = Some(buffer);
        self.calls.push(RecordedCall::BindVertexBuffer(buffer));
        Ok(())
    }

    fn set_part_uniforms(&mut self, world: &Mat4, material: &MaterialUniforms) -> BackendResult<()> {
        self.require_frame("set_part_uniforms")?;
        for texture in [material.diffuse_map, material.specular_map] {
            if !self.textures.contains_key(texture) {
                return Err(RenderError::InvalidHandle(format!("{:?}", texture)));
            }
        }
        self.calls.push(RecordedCall::SetPartUniforms {
            world: *world,
            material: *material,
        });
        Ok(())
    }

    fn draw(&mut self, buffer: BufferHandle) -> BackendResult<()> {
        self.require_frame("draw")?;
        if self.bound_buffer != Some(buffer) {
            return Err(RenderError::RenderingFailed(format!("draw of unbound buffer {:?}", buffer)));
        }
        let vertex_count = self
            .buffers
            .get(buffer)
            .map(VertexAttributes::vertex_count)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", buffer)))?;
        self.calls.push(RecordedCall::Draw { buffer, vertex_count });
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.require_frame("end_frame")?;
        self.in_frame = false;
        self.calls.push(RecordedCall::EndFrame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ColorAttribute;

    fn triangle() -> VertexAttributes {
        VertexAttributes {
            position: vec![0.0; 9],
            normal: Vec::new(),
            texcoord: Vec::new(),
            color: ColorAttribute::Constant([1.0; 4]),
        }
    }

    #[test]
    fn test_solid_texture_is_one_pixel() {
        let mut backend = RecordingBackend::new(1, 1);
        let handle = backend.create_solid_texture([255, 255, 255, 255]).unwrap();

        let image = backend.texture(handle).unwrap();
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.data, vec![255; 4]);
    }

    #[test]
    fn test_rejects_malformed_resources() {
        let mut backend = RecordingBackend::new(1, 1);
        let bad = ImageData {
            data: vec![0; 3],
            width: 1,
            height: 1,
        };
        assert!(backend.create_texture(&bad).is_err());

        let mut empty = triangle();
        empty.position.clear();
        assert!(backend.create_vertex_buffer(&empty).is_err());
    }

    #[test]
    fn test_draw_requires_frame_and_bound_buffer() {
        let mut backend = RecordingBackend::new(1, 1);
        let buffer = backend.create_vertex_buffer(&triangle()).unwrap();

        assert!(backend.draw(buffer).is_err());

        backend.begin_frame().unwrap();
        assert!(backend.draw(buffer).is_err());
        backend.bind_vertex_buffer(buffer).unwrap();
        backend.draw(buffer).unwrap();
        backend.end_frame().unwrap();

        assert_eq!(
            backend.calls().last(),
            Some(&RecordedCall::EndFrame)
        );
    }
}
