//! Backend abstraction traits for the rendering system
//!
//! The render loop and scene bootstrap only talk to the GPU through
//! [`RenderBackend`]. Resources are referred to by opaque slotmap keys so a
//! backend can store them however it likes.

use crate::assets::ImageData;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::RenderError;
use slotmap::new_key_type;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

new_key_type! {
    /// Handle to a texture stored in the backend
    pub struct TextureHandle;

    /// Handle to a vertex buffer stored in the backend
    pub struct BufferHandle;
}

/// Vertex color source for one buffer
#[derive(Debug, Clone, PartialEq)]
pub enum ColorAttribute {
    /// One color per vertex
    PerVertex {
        /// Components per vertex
        components: usize,
        /// Flat color data
        data: Vec<f32>,
    },
    /// A single value shared by every vertex
    Constant([f32; 4]),
}

impl ColorAttribute {
    /// Color of vertex `index` as RGBA
    pub fn rgba(&self, index: usize) -> [f32; 4] {
        match self {
            Self::Constant(value) => *value,
            Self::PerVertex { components, data } => {
                let start = index * components;
                let mut rgba = [1.0; 4];
                for (slot, value) in rgba.iter_mut().zip(data.iter().skip(start).take(*components)) {
                    *slot = *value;
                }
                rgba
            }
        }
    }
}

/// Attribute set uploaded as one vertex buffer
///
/// Positions and normals are 3 components per vertex, texture coordinates 2.
/// Normals and texture coordinates may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttributes {
    /// Vertex positions
    pub position: Vec<f32>,
    /// Vertex normals
    pub normal: Vec<f32>,
    /// Texture coordinates
    pub texcoord: Vec<f32>,
    /// Vertex colors
    pub color: ColorAttribute,
}

impl VertexAttributes {
    /// Number of vertices to draw
    pub fn vertex_count(&self) -> usize {
        self.position.len() / 3
    }
}

/// Uniforms shared by every part in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedUniforms {
    /// Normalized direction towards the light
    pub light_direction: Vec3,
    /// World to camera
    pub view: Mat4,
    /// Camera to clip
    pub projection: Mat4,
    /// Camera position in world space
    pub view_world_position: Vec3,
}

/// Fully resolved material values for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialUniforms {
    /// Diffuse color
    pub diffuse: Vec3,
    /// Diffuse texture
    pub diffuse_map: TextureHandle,
    /// Ambient color
    pub ambient: Vec3,
    /// Emissive color
    pub emissive: Vec3,
    /// Specular color
    pub specular: Vec3,
    /// Specular texture
    pub specular_map: TextureHandle,
    /// Specular exponent
    pub shininess: f32,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
}

/// Whether a frame can be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Commands may be recorded
    Ready,
    /// The surface is unavailable (minimized or being recreated); skip drawing
    Skipped,
}

/// Main rendering backend trait
///
/// Calls within a frame arrive in this order: `begin_frame`, `set_viewport`,
/// `set_depth_test`, `set_shared_uniforms`, then `bind_vertex_buffer`,
/// `set_part_uniforms` and `draw` per part, and finally `end_frame`.
pub trait RenderBackend {
    /// Upload an RGBA8 image as a texture
    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle>;

    /// Create a 1x1 texture of a single color
    fn create_solid_texture(&mut self, color: [u8; 4]) -> BackendResult<TextureHandle> {
        self.create_texture(&ImageData::solid_color(1, 1, color))
    }

    /// Upload an attribute set as a vertex buffer
    fn create_vertex_buffer(&mut self, attributes: &VertexAttributes) -> BackendResult<BufferHandle>;

    /// Current size of the display (window framebuffer) in pixels
    fn display_size(&self) -> (u32, u32);

    /// Current size of the drawable surface in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Resize the drawable surface
    fn resize_surface(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Start recording a frame
    fn begin_frame(&mut self) -> BackendResult<FrameStatus>;

    /// Set the viewport rectangle
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Enable or disable depth testing for subsequent draws
    fn set_depth_test(&mut self, enabled: bool);

    /// Set uniforms shared by every part
    fn set_shared_uniforms(&mut self, uniforms: &SharedUniforms) -> BackendResult<()>;

    /// Bind a vertex buffer for subsequent draws
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle) -> BackendResult<()>;

    /// Set the world matrix and material for subsequent draws
    fn set_part_uniforms(&mut self, world: &Mat4, material: &MaterialUniforms) -> BackendResult<()>;

    /// Draw every vertex of `buffer`
    fn draw(&mut self, buffer: BufferHandle) -> BackendResult<()>;

    /// Finish and present the frame
    fn end_frame(&mut self) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_color_applies_to_every_vertex() {
        let color = ColorAttribute::Constant([1.0, 1.0, 1.0, 1.0]);
        assert_eq!(color.rgba(0), [1.0; 4]);
        assert_eq!(color.rgba(99), [1.0; 4]);
    }

    #[test]
    fn test_per_vertex_rgb_gets_opaque_alpha() {
        let color = ColorAttribute::PerVertex {
            components: 3,
            data: vec![1.0, 0.0, 0.0, 0.0, 0.5, 0.0],
        };
        assert_eq!(color.rgba(1), [0.0, 0.5, 0.0, 1.0]);
    }
}
